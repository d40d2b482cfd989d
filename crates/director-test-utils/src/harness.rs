// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end routing tests.
//!
//! `TestHarness` wires a real registry, monitor, router and dispatcher to a
//! [`MockBackend`], a [`RecordingTransport`] and a [`ScriptedProbe`], so a
//! test can set capacity, submit work and assert on jobs and events.

use std::sync::Arc;
use std::time::Duration;

use director_config::DirectorConfig;
use director_core::{
    Capability, DirectorError, Job, PoolId, QualityTier, ResourceProbe, ResourceSnapshot,
    WorkerProfile,
};
use director_dispatch::{Dispatcher, NotificationEmitter};
use director_router::{ResourceMonitor, TierRegistry, TierRouter};

use crate::mock_backend::MockBackend;
use crate::recording_transport::RecordingTransport;
use crate::scripted_probe::ScriptedProbe;

/// Pool used by [`TestHarnessBuilder::with_image_tiers`].
pub const DEFAULT_POOL: &str = "gpu";

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    entries: Vec<(Capability, QualityTier, WorkerProfile)>,
    snapshot: Option<ResourceSnapshot>,
    refresh_timeout: Duration,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            snapshot: None,
            refresh_timeout: Duration::from_secs(1),
        }
    }

    /// Register one profile.
    pub fn with_profile(
        mut self,
        capability: &str,
        tier: QualityTier,
        profile: WorkerProfile,
    ) -> Self {
        self.entries.push((Capability::from(capability), tier, profile));
        self
    }

    /// `create_image` at Low=4, Standard=8, High=16 on [`DEFAULT_POOL`].
    pub fn with_image_tiers(self) -> Self {
        self.with_profile(
            "create_image",
            QualityTier::Low,
            WorkerProfile::new("sd-turbo", DEFAULT_POOL, 4),
        )
        .with_profile(
            "create_image",
            QualityTier::Standard,
            WorkerProfile::new("sdxl", DEFAULT_POOL, 8),
        )
        .with_profile(
            "create_image",
            QualityTier::High,
            WorkerProfile::new("sdxl-refiner", DEFAULT_POOL, 16),
        )
    }

    /// Profiles and pool capacities from a loaded configuration.
    pub fn with_config(mut self, config: &DirectorConfig) -> Self {
        self.entries.extend(config.registry_entries());
        self.snapshot = Some(config.static_snapshot());
        self
    }

    /// Free units in `pool` for the initial snapshot.
    pub fn with_available(mut self, pool: &str, units: u64) -> Self {
        let snapshot = self.snapshot.take().unwrap_or_default();
        self.snapshot = Some(snapshot.with_pool(pool, units, 0));
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Build the harness and take the first snapshot.
    pub async fn build(self) -> TestHarness {
        let registry = Arc::new(TierRegistry::from_entries(self.entries));

        let probe = Arc::new(ScriptedProbe::new());
        if let Some(snapshot) = self.snapshot {
            probe.set(snapshot).await;
        }
        let monitor = Arc::new(ResourceMonitor::new(
            Arc::clone(&probe) as Arc<dyn ResourceProbe>,
            self.refresh_timeout,
        ));
        monitor.refresh().await;

        let backend = Arc::new(MockBackend::new());
        let transport = Arc::new(RecordingTransport::new());
        let dispatcher = Arc::new(Dispatcher::new(
            TierRouter::new(Arc::clone(&registry)),
            Arc::clone(&monitor),
            backend.clone(),
            NotificationEmitter::new(transport.clone()),
        ));

        TestHarness {
            dispatcher,
            registry,
            monitor,
            probe,
            backend,
            transport,
        }
    }
}

/// A fully wired routing stack with mock collaborators.
pub struct TestHarness {
    pub dispatcher: Arc<Dispatcher>,
    pub registry: Arc<TierRegistry>,
    pub monitor: Arc<ResourceMonitor>,
    pub probe: Arc<ScriptedProbe>,
    pub backend: Arc<MockBackend>,
    pub transport: Arc<RecordingTransport>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Change one pool's free units and refresh the monitor.
    pub async fn set_available(&self, pool: &str, units: u64) {
        self.probe.set_available(PoolId::from(pool), units).await;
        self.monitor.refresh().await;
    }

    /// Submit with an empty payload.
    pub async fn submit(&self, capability: &str, tier: QualityTier) -> Job {
        self.dispatcher
            .submit(Capability::from(capability), tier, serde_json::json!({}))
            .await
    }

    /// Drive a queued job through start and successful completion.
    pub async fn run_to_success(&self, job: &Job) -> Result<Job, DirectorError> {
        self.dispatcher.on_backend_started(job.id).await?;
        self.dispatcher.on_backend_complete(job.id, Ok(())).await?;
        self.dispatcher
            .get(job.id)
            .ok_or(DirectorError::JobNotFound { job_id: job.id })
    }
}

#[cfg(test)]
mod tests {
    use director_core::JobStatus;

    use super::*;

    #[tokio::test]
    async fn harness_routes_and_completes() {
        let harness = TestHarness::builder()
            .with_image_tiers()
            .with_available(DEFAULT_POOL, 20)
            .build()
            .await;

        let job = harness.submit("create_image", QualityTier::High).await;
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(
            harness.backend.backend_for(job.id).await.as_deref(),
            Some("sdxl-refiner")
        );

        let done = harness.run_to_success(&job).await.unwrap();
        assert_eq!(done.status, JobStatus::Succeeded);
    }
}
