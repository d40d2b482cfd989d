// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock execution backend for deterministic testing.
//!
//! `MockBackend` accepts (or refuses) hand-offs and records them. It never
//! calls back into the dispatcher; tests drive `on_backend_*` themselves so
//! the ordering is explicit.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use director_core::{
    Adapter, AdapterType, DirectorError, ExecutionBackend, HealthStatus, JobId, WorkerProfile,
};

/// One recorded `execute` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub job_id: JobId,
    pub backend_id: String,
    pub payload: serde_json::Value,
}

pub struct MockBackend {
    executions: Mutex<Vec<Execution>>,
    cancels: Mutex<Vec<JobId>>,
    refuse: AtomicBool,
    fail_cancel: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            executions: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
            refuse: AtomicBool::new(false),
            fail_cancel: AtomicBool::new(false),
        }
    }

    /// Make every following `execute` call fail.
    pub fn refuse_jobs(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Make every following `cancel` call fail.
    pub fn fail_cancels(&self, fail: bool) {
        self.fail_cancel.store(fail, Ordering::SeqCst);
    }

    pub async fn executions(&self) -> Vec<Execution> {
        self.executions.lock().await.clone()
    }

    /// Backend id chosen for `job_id`, if it was handed off.
    pub async fn backend_for(&self, job_id: JobId) -> Option<String> {
        self.executions
            .lock()
            .await
            .iter()
            .find(|e| e.job_id == job_id)
            .map(|e| e.backend_id.clone())
    }

    pub async fn cancels(&self) -> Vec<JobId> {
        self.cancels.lock().await.clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, DirectorError> {
        if self.refuse.load(Ordering::SeqCst) {
            Ok(HealthStatus::Degraded("refusing jobs".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

#[async_trait]
impl ExecutionBackend for MockBackend {
    async fn execute(
        &self,
        job_id: JobId,
        profile: &WorkerProfile,
        payload: serde_json::Value,
    ) -> Result<(), DirectorError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(DirectorError::backend("mock backend refusing jobs"));
        }
        self.executions.lock().await.push(Execution {
            job_id,
            backend_id: profile.backend_id.clone(),
            payload,
        });
        Ok(())
    }

    async fn cancel(&self, job_id: JobId) -> Result<(), DirectorError> {
        self.cancels.lock().await.push(job_id);
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(DirectorError::backend("mock backend cannot cancel"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_executions_and_refuses_on_demand() {
        let backend = MockBackend::new();
        let profile = WorkerProfile::new("sdxl", "gpu", 8);
        let id = JobId::new();

        backend
            .execute(id, &profile, serde_json::json!({"prompt": "a fox"}))
            .await
            .unwrap();
        assert_eq!(backend.backend_for(id).await.as_deref(), Some("sdxl"));

        backend.refuse_jobs(true);
        assert!(backend.execute(JobId::new(), &profile, serde_json::Value::Null).await.is_err());
        assert_eq!(backend.executions().await.len(), 1);
        assert!(matches!(
            backend.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }
}
