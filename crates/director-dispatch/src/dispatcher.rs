// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job dispatcher: routes submissions, hands them to the backend, and owns
//! every job's lifecycle.
//!
//! Jobs live in a [`DashMap`]. Each state change happens while holding that
//! job's entry, so transitions on one job are serialized; the entry is
//! released before any event is emitted or the backend is called.
//!
//! Each `submit` routes against whatever snapshot the monitor holds at that
//! moment and nothing is reserved. Two concurrent submissions can therefore
//! both be placed even when their combined cost exceeds what the snapshot
//! showed as free. Admission control across jobs belongs to a layer above.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use director_core::{
    Capability, DirectorError, EventKind, ExecutionBackend, FailureKind, Job, JobFailure, JobId,
    JobStatus, QualityTier,
};
use director_router::{ResourceMonitor, TierRouter};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::notify::NotificationEmitter;

/// What `on_backend_complete` did with a completion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The job moved to this terminal status.
    Applied(JobStatus),
    /// The job was already terminal; nothing changed.
    Ignored,
}

/// Number of tracked jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl JobCounts {
    pub fn active(&self) -> usize {
        self.queued + self.running
    }

    pub fn total(&self) -> usize {
        self.active() + self.succeeded + self.failed + self.cancelled
    }
}

pub struct Dispatcher {
    router: TierRouter,
    monitor: Arc<ResourceMonitor>,
    backend: Arc<dyn ExecutionBackend>,
    emitter: NotificationEmitter,
    jobs: DashMap<JobId, Job>,
}

impl Dispatcher {
    pub fn new(
        router: TierRouter,
        monitor: Arc<ResourceMonitor>,
        backend: Arc<dyn ExecutionBackend>,
        emitter: NotificationEmitter,
    ) -> Self {
        Self {
            router,
            monitor,
            backend,
            emitter,
            jobs: DashMap::new(),
        }
    }

    pub fn router(&self) -> &TierRouter {
        &self.router
    }

    pub fn monitor(&self) -> &Arc<ResourceMonitor> {
        &self.monitor
    }

    /// Route a request and hand it to the backend.
    ///
    /// Never fails outright: a routing error produces a job that is already
    /// `Failed`, so every submission is observable the same way. A backend
    /// that refuses the hand-off moves the job from `Queued` to `Failed`.
    /// The returned job reflects its state when this call returns.
    pub async fn submit(
        &self,
        capability: Capability,
        tier: QualityTier,
        payload: serde_json::Value,
    ) -> Job {
        metrics::record_submitted(&capability);
        let snapshot = self.monitor.snapshot();

        let route = match self.router.resolve(&capability, tier, &snapshot) {
            Ok(route) => route,
            Err(err) => return self.reject(capability, tier, &err).await,
        };

        let job = Job::queued(capability, tier, Arc::clone(&route.profile), &route.decision);
        let job_id = job.id;
        self.jobs.insert(job_id, job.clone());
        info!(
            job_id = %job_id,
            capability = %job.capability,
            requested = %tier,
            accepted = %route.decision.accepted_tier,
            backend = route.profile.backend_id.as_str(),
            "job queued"
        );

        if route.decision.is_downgrade() {
            metrics::record_fallback(&job.capability, route.decision.reason);
            self.emitter
                .emit(EventKind::Downgraded, &job, Some(&route.decision))
                .await;
        }
        self.emitter.emit(EventKind::Queued, &job, None).await;

        if let Err(e) = self.backend.execute(job_id, &route.profile, payload).await {
            warn!(job_id = %job_id, error = %e, "backend refused job");
            let failure = JobFailure {
                kind: FailureKind::BackendRejected,
                message: e.to_string(),
            };
            // The backend may already have reported on this job; only a job
            // still waiting in Queued is failed here.
            let refused = self.apply(job_id, |job| {
                if job.status == JobStatus::Queued {
                    job.fail(failure).map(|()| true)
                } else {
                    Ok(false)
                }
            });
            if let Ok((failed_job, true)) = refused {
                metrics::record_finished(JobStatus::Failed);
                self.emitter.emit(EventKind::Failed, &failed_job, None).await;
            }
        }

        self.get(job_id).unwrap_or(job)
    }

    async fn reject(&self, capability: Capability, tier: QualityTier, err: &DirectorError) -> Job {
        let failure = JobFailure::from_routing_error(err).unwrap_or_else(|| JobFailure {
            kind: FailureKind::BackendError,
            message: err.to_string(),
        });
        metrics::record_routing_failure(failure.kind);
        metrics::record_finished(JobStatus::Failed);

        let job = Job::rejected(capability, tier, failure);
        warn!(
            job_id = %job.id,
            capability = %job.capability,
            requested = %tier,
            error = %err,
            "job could not be routed"
        );
        self.jobs.insert(job.id, job.clone());
        self.emitter.emit(EventKind::Failed, &job, None).await;
        job
    }

    /// Backend picked the job up: `Queued` becomes `Running`.
    ///
    /// A repeated or late report on a job that is already running or
    /// finished changes nothing.
    pub async fn on_backend_started(&self, job_id: JobId) -> Result<(), DirectorError> {
        let (job, started) = self.apply(job_id, |job| match job.status {
            JobStatus::Queued => job.transition(JobStatus::Running).map(|()| true),
            status => {
                debug!(job_id = %job_id, status = %status, "duplicate start report ignored");
                Ok(false)
            }
        })?;
        if started {
            self.emitter.emit(EventKind::Started, &job, None).await;
        }
        Ok(())
    }

    /// Record progress for a job.
    ///
    /// Values above 100 are clamped. Progress only moves forward, so a report
    /// arriving out of order is dropped. A `Queued` job is started first, as
    /// if its start report had been lost. Reports for finished jobs are
    /// ignored.
    pub async fn on_backend_progress(&self, job_id: JobId, percent: u8) -> Result<(), DirectorError> {
        let percent = percent.min(100);
        let (job, (started, advanced)) = self.apply(job_id, |job| {
            if job.is_terminal() {
                debug!(job_id = %job_id, status = %job.status, "progress for finished job ignored");
                return Ok((None, false));
            }
            let started = start_if_queued(job)?;
            if percent > job.progress {
                job.progress = percent;
                Ok((started, true))
            } else {
                Ok((started, false))
            }
        })?;
        if let Some(running) = &started {
            self.emitter.emit(EventKind::Started, running, None).await;
        }
        if advanced {
            self.emitter.emit(EventKind::Progress, &job, None).await;
        }
        Ok(())
    }

    /// Backend finished the job.
    ///
    /// `Running` moves to `Succeeded` or `Failed`. A `Queued` job passes
    /// through `Running` first and gets its `Started` event. A finished job
    /// stays as it is and the report is [`CompletionOutcome::Ignored`].
    pub async fn on_backend_complete(
        &self,
        job_id: JobId,
        result: Result<(), String>,
    ) -> Result<CompletionOutcome, DirectorError> {
        let (job, (started, outcome)) = self.apply(job_id, |job| {
            if job.is_terminal() {
                debug!(job_id = %job_id, status = %job.status, "completion for finished job ignored");
                return Ok((None, CompletionOutcome::Ignored));
            }
            let started = start_if_queued(job)?;
            let applied = match &result {
                Ok(()) => job.transition(JobStatus::Succeeded),
                Err(message) => job.fail(JobFailure {
                    kind: FailureKind::BackendError,
                    message: message.clone(),
                }),
            };
            match applied {
                Ok(()) => Ok((started, CompletionOutcome::Applied(job.status))),
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "refused completion");
                    Err(e)
                }
            }
        })?;

        if let Some(running) = &started {
            self.emitter.emit(EventKind::Started, running, None).await;
        }
        if let CompletionOutcome::Applied(status) = outcome {
            metrics::record_finished(status);
            let kind = if status == JobStatus::Succeeded {
                info!(job_id = %job_id, "job succeeded");
                EventKind::Succeeded
            } else {
                warn!(job_id = %job_id, "job failed in backend");
                EventKind::Failed
            };
            self.emitter.emit(kind, &job, None).await;
        }
        Ok(outcome)
    }

    /// Cancel a queued or running job, then ask the backend to stop.
    ///
    /// The job is `Cancelled` whether or not the backend honours the stop
    /// request.
    pub async fn cancel(&self, job_id: JobId) -> Result<Job, DirectorError> {
        let (job, ()) = self.apply(job_id, |job| {
            if job.is_terminal() {
                return Err(DirectorError::AlreadyTerminal {
                    job_id,
                    status: job.status,
                });
            }
            job.transition(JobStatus::Cancelled)
        })?;

        info!(job_id = %job_id, "job cancelled");
        metrics::record_finished(JobStatus::Cancelled);
        self.emitter.emit(EventKind::Cancelled, &job, None).await;

        if let Err(e) = self.backend.cancel(job_id).await {
            warn!(job_id = %job_id, error = %e, "backend cancel request failed");
        }
        Ok(job)
    }

    pub fn get(&self, job_id: JobId) -> Option<Job> {
        self.jobs.get(&job_id).map(|entry| entry.clone())
    }

    /// Tracked jobs, optionally filtered by status, oldest first.
    pub fn jobs(&self, status: Option<JobStatus>) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| status.is_none_or(|s| entry.status == s))
            .map(|entry| entry.clone())
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    pub fn counts(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for entry in self.jobs.iter() {
            match entry.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Running => counts.running += 1,
                JobStatus::Succeeded => counts.succeeded += 1,
                JobStatus::Failed => counts.failed += 1,
                JobStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    /// Forget finished jobs whose `finished_at` is older than `older_than`.
    /// Returns how many were removed.
    pub fn prune_terminal(&self, older_than: Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(older_than) else {
            return 0;
        };
        let cutoff = chrono::Utc::now() - retention;
        let before = self.jobs.len();
        self.jobs.retain(|_, job| match job.finished_at {
            Some(finished) if job.is_terminal() => finished > cutoff,
            _ => true,
        });
        let pruned = before.saturating_sub(self.jobs.len());
        if pruned > 0 {
            debug!(pruned, "pruned finished jobs");
        }
        metrics::set_active_jobs(self.counts().active());
        pruned
    }

    /// Prune every `interval` with the given retention until `cancel` fires.
    pub fn spawn_pruner(
        self: &Arc<Self>,
        retention: Duration,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        dispatcher.prune_terminal(retention);
                    }
                    _ = cancel.cancelled() => {
                        debug!("job pruner shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Run `f` on the job while holding its entry, returning a copy of the
    /// job as `f` left it. The entry is released before this returns.
    fn apply<T>(
        &self,
        job_id: JobId,
        f: impl FnOnce(&mut Job) -> Result<T, DirectorError>,
    ) -> Result<(Job, T), DirectorError> {
        let mut entry = self
            .jobs
            .get_mut(&job_id)
            .ok_or(DirectorError::JobNotFound { job_id })?;
        let out = f(entry.value_mut())?;
        Ok((entry.value().clone(), out))
    }
}

/// Move a `Queued` job to `Running` for a backend report that implies it
/// started. Returns the job as it stood right after starting.
fn start_if_queued(job: &mut Job) -> Result<Option<Job>, DirectorError> {
    if job.status != JobStatus::Queued {
        return Ok(None);
    }
    job.transition(JobStatus::Running)?;
    debug!(job_id = %job.id, "start implied by backend report");
    Ok(Some(job.clone()))
}
