// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification transport that keeps every event for later assertions.

use async_trait::async_trait;
use tokio::sync::Mutex;

use director_core::{
    Adapter, AdapterType, DirectorError, EventKind, JobEvent, JobId, NotificationTransport,
};

#[derive(Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<JobEvent>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<JobEvent> {
        self.events.lock().await.clone()
    }

    /// Events for one job, in publish order.
    pub async fn events_for(&self, job_id: JobId) -> Vec<JobEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect()
    }

    pub async fn kinds_for(&self, job_id: JobId) -> Vec<EventKind> {
        self.events_for(job_id).await.iter().map(|e| e.kind).collect()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl Adapter for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn publish(&self, event: JobEvent) -> Result<(), DirectorError> {
        self.events.lock().await.push(event);
        Ok(())
    }
}
