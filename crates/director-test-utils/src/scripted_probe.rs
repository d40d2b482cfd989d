// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resource probe whose readings are set by the test.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use director_core::{
    Adapter, AdapterType, DirectorError, PoolId, ResourceProbe, ResourceSnapshot,
};

/// Returns the current scripted snapshot on every read.
///
/// Reads fail while no snapshot has been set, or while failures queued with
/// [`ScriptedProbe::fail_next`] remain.
#[derive(Default)]
pub struct ScriptedProbe {
    current: Mutex<Option<ResourceSnapshot>>,
    pending_failures: AtomicUsize,
    reads: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, snapshot: ResourceSnapshot) {
        *self.current.lock().await = Some(snapshot);
    }

    /// Set one pool to `units` free, keeping the other pools.
    pub async fn set_available(&self, pool: impl Into<PoolId>, units: u64) {
        let mut current = self.current.lock().await;
        let snapshot = current.take().unwrap_or_default();
        *current = Some(snapshot.with_pool(pool, units, 0));
    }

    /// Fail the next `count` reads.
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.fetch_add(count, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for ScriptedProbe {
    fn name(&self) -> &str {
        "scripted"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Probe
    }
}

#[async_trait]
impl ResourceProbe for ScriptedProbe {
    async fn read(&self) -> Result<ResourceSnapshot, DirectorError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DirectorError::probe("scripted probe failure"));
        }

        let current = self.current.lock().await;
        let mut snapshot = current
            .clone()
            .ok_or_else(|| DirectorError::probe("no scripted reading"))?;
        snapshot.taken_at = chrono::Utc::now();
        Ok(snapshot)
    }
}
