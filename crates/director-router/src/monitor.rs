// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cached resource snapshots with bounded background refresh.
//!
//! [`ResourceMonitor::snapshot`] never touches the probe. Only
//! [`ResourceMonitor::refresh`] does, under a timeout, and a failed or slow
//! read leaves the previous snapshot in place.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use director_core::{DirectorError, ResourceProbe, ResourceSnapshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Holds the latest [`ResourceSnapshot`] and refreshes it from a probe.
pub struct ResourceMonitor {
    probe: Arc<dyn ResourceProbe>,
    current: ArcSwap<ResourceSnapshot>,
    refresh_timeout: Duration,
}

impl ResourceMonitor {
    /// Monitor starting from an empty snapshot. Every pool reads as unknown
    /// until the first successful refresh.
    pub fn new(probe: Arc<dyn ResourceProbe>, refresh_timeout: Duration) -> Self {
        Self::with_initial(probe, refresh_timeout, ResourceSnapshot::empty())
    }

    pub fn with_initial(
        probe: Arc<dyn ResourceProbe>,
        refresh_timeout: Duration,
        initial: ResourceSnapshot,
    ) -> Self {
        Self {
            probe,
            current: ArcSwap::from_pointee(initial),
            refresh_timeout,
        }
    }

    /// The cached snapshot. Never blocks on the probe.
    pub fn snapshot(&self) -> Arc<ResourceSnapshot> {
        self.current.load_full()
    }

    /// Age of the cached snapshot. Zero if the probe clock ran ahead.
    pub fn staleness(&self) -> Duration {
        self.current.load().age().to_std().unwrap_or(Duration::ZERO)
    }

    /// Read the probe once and install the result.
    ///
    /// Returns `true` when a new snapshot was installed. Probe errors and
    /// timeouts are logged and counted, never returned.
    pub async fn refresh(&self) -> bool {
        let read = match tokio::time::timeout(self.refresh_timeout, self.probe.read()).await {
            Ok(read) => read,
            Err(_) => Err(DirectorError::Timeout {
                duration: self.refresh_timeout,
            }),
        };

        match read {
            Ok(snapshot) => {
                debug!(
                    probe = self.probe.name(),
                    pools = snapshot.pools.len(),
                    "resource snapshot refreshed"
                );
                self.current.store(Arc::new(snapshot));
                true
            }
            Err(e) => {
                metrics::counter!("director_snapshot_refresh_failures_total").increment(1);
                warn!(
                    probe = self.probe.name(),
                    error = %e,
                    retryable = e.is_retryable(),
                    staleness_ms = self.staleness().as_millis() as u64,
                    "probe read failed, keeping previous snapshot"
                );
                false
            }
        }
    }

    /// Refresh every `interval` until `cancel` fires.
    ///
    /// The first refresh happens immediately. Ticks missed while a slow read
    /// was in flight are skipped rather than replayed.
    pub fn spawn(self: &Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            info!(
                probe = monitor.probe.name(),
                interval_ms = interval.as_millis() as u64,
                "resource monitor started"
            );
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.refresh().await;
                    }
                    _ = cancel.cancelled() => {
                        info!("resource monitor shutting down");
                        break;
                    }
                }
            }
        })
    }
}
