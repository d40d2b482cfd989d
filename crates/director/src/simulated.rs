// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in execution backend for `director serve`.
//!
//! Jobs sleep for a time scaled from the profile's minimum duration and
//! report progress in quarters. Reports travel over a channel to
//! [`pump_reports`], which feeds them into the dispatcher callbacks; the
//! backend itself never holds a reference to the dispatcher.
//!
//! A job's resource cost sits in the [`CommitLedger`] from hand-off until it
//! finishes or is cancelled, so the static probe reports it as committed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use director_core::{
    Adapter, AdapterType, DirectorError, ExecutionBackend, JobId, PoolId, WorkerProfile,
};
use director_dispatch::{CompletionOutcome, Dispatcher};
use director_router::CommitLedger;

const STEPS: u8 = 4;

/// One lifecycle report from a simulated job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendReport {
    Started(JobId),
    Progress(JobId, u8),
    Completed(JobId, Result<(), String>),
}

struct RunningJob {
    token: CancellationToken,
    pool: PoolId,
    cost: u64,
}

/// Runs every accepted job on a tokio task.
pub struct SimulatedBackend {
    reports: mpsc::UnboundedSender<BackendReport>,
    running: Arc<DashMap<JobId, RunningJob>>,
    ledger: Arc<CommitLedger>,
    millis_per_sec: u64,
}

impl SimulatedBackend {
    /// `millis_per_sec` maps one nominal second of profile duration to real
    /// milliseconds.
    pub fn new(
        reports: mpsc::UnboundedSender<BackendReport>,
        millis_per_sec: u64,
        ledger: Arc<CommitLedger>,
    ) -> Self {
        Self {
            reports,
            running: Arc::new(DashMap::new()),
            ledger,
            millis_per_sec,
        }
    }

    /// Jobs handed off and not yet finished or cancelled.
    pub fn running(&self) -> usize {
        self.running.len()
    }

    fn job_duration(&self, profile: &WorkerProfile) -> Duration {
        let nominal = profile.duration.min_secs.max(1);
        Duration::from_millis(nominal.saturating_mul(self.millis_per_sec))
    }
}

#[async_trait]
impl Adapter for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }
}

#[async_trait]
impl ExecutionBackend for SimulatedBackend {
    async fn execute(
        &self,
        job_id: JobId,
        profile: &WorkerProfile,
        payload: serde_json::Value,
    ) -> Result<(), DirectorError> {
        if self.reports.is_closed() {
            return Err(DirectorError::backend("report channel closed"));
        }

        let token = CancellationToken::new();
        self.ledger.commit(&profile.pool, profile.resource_cost);
        self.running.insert(
            job_id,
            RunningJob {
                token: token.clone(),
                pool: profile.pool.clone(),
                cost: profile.resource_cost,
            },
        );

        let step = self.job_duration(profile) / u32::from(STEPS);
        let fail = payload.get("fail").and_then(|v| v.as_bool()).unwrap_or(false);
        let reports = self.reports.clone();
        let running = Arc::clone(&self.running);
        let ledger = Arc::clone(&self.ledger);
        let backend_id = profile.backend_id.clone();

        tokio::spawn(async move {
            if token.is_cancelled() {
                return;
            }
            debug!(job_id = %job_id, backend = backend_id.as_str(), "simulated job started");
            let _ = reports.send(BackendReport::Started(job_id));

            for n in 1..=STEPS {
                tokio::select! {
                    _ = tokio::time::sleep(step) => {}
                    _ = token.cancelled() => {
                        debug!(job_id = %job_id, "simulated job stopped");
                        return;
                    }
                }
                if n < STEPS {
                    let _ = reports.send(BackendReport::Progress(job_id, n * (100 / STEPS)));
                }
            }

            // A concurrent cancel may have released the units already.
            if let Some((_, job)) = running.remove(&job_id) {
                ledger.release(&job.pool, job.cost);
            }
            let outcome = if fail {
                Err("simulated failure".to_string())
            } else {
                Ok(())
            };
            let _ = reports.send(BackendReport::Completed(job_id, outcome));
        });

        Ok(())
    }

    async fn cancel(&self, job_id: JobId) -> Result<(), DirectorError> {
        if let Some((_, job)) = self.running.remove(&job_id) {
            self.ledger.release(&job.pool, job.cost);
            job.token.cancel();
        }
        Ok(())
    }
}

/// Feed backend reports into the dispatcher until the channel closes or
/// `cancel` fires.
pub async fn pump_reports(
    dispatcher: Arc<Dispatcher>,
    mut rx: mpsc::UnboundedReceiver<BackendReport>,
    cancel: CancellationToken,
) {
    loop {
        let report = tokio::select! {
            report = rx.recv() => match report {
                Some(report) => report,
                None => break,
            },
            _ = cancel.cancelled() => break,
        };

        let result = match report {
            BackendReport::Started(job_id) => dispatcher.on_backend_started(job_id).await,
            BackendReport::Progress(job_id, percent) => {
                dispatcher.on_backend_progress(job_id, percent).await
            }
            BackendReport::Completed(job_id, outcome) => {
                match dispatcher.on_backend_complete(job_id, outcome).await {
                    Ok(CompletionOutcome::Applied(status)) => {
                        info!(job_id = %job_id, status = %status, "job finished");
                        Ok(())
                    }
                    Ok(CompletionOutcome::Ignored) => Ok(()),
                    Err(e) => Err(e),
                }
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "backend report rejected");
        }
    }
    debug!("backend report pump stopped");
}
