// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in resource probes.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::Utc;
use director_config::{DirectorConfig, ProbeKind};
use director_core::{Adapter, AdapterType, DirectorError, PoolId, ResourceProbe, ResourceSnapshot};
use tracing::debug;

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Units held by jobs a backend is currently running, per pool.
///
/// The backend commits a job's cost when it accepts the job and releases it
/// when the job stops. [`StaticProbe`] folds these totals into every reading.
#[derive(Debug, Default)]
pub struct CommitLedger {
    units: ArcSwap<BTreeMap<PoolId, u64>>,
}

impl CommitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&self, pool: &PoolId, units: u64) {
        self.units.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            let held = next.entry(pool.clone()).or_insert(0);
            *held = held.saturating_add(units);
            next
        });
    }

    /// Give back units taken by [`CommitLedger::commit`]. Releasing more than
    /// is held leaves the pool at zero.
    pub fn release(&self, pool: &PoolId, units: u64) {
        self.units.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            let remaining = next.get(pool).copied().unwrap_or(0).saturating_sub(units);
            if remaining == 0 {
                next.remove(pool);
            } else {
                next.insert(pool.clone(), remaining);
            }
            next
        });
    }

    pub fn committed(&self, pool: &PoolId) -> u64 {
        self.units.load().get(pool).copied().unwrap_or(0)
    }
}

/// Reports configured pool capacities, re-stamped on every read.
///
/// With a [`CommitLedger`] attached, each pool's `committed` is whatever the
/// ledger currently holds for it. The capacities can be swapped at runtime
/// with [`StaticProbe::set_template`], e.g. after a config reload.
pub struct StaticProbe {
    template: ArcSwap<ResourceSnapshot>,
    ledger: Option<Arc<CommitLedger>>,
}

impl StaticProbe {
    pub fn new(template: ResourceSnapshot) -> Self {
        Self {
            template: ArcSwap::from_pointee(template),
            ledger: None,
        }
    }

    /// Capacities from `[[pools]]`, nothing committed.
    pub fn from_config(config: &DirectorConfig) -> Self {
        Self::new(config.static_snapshot())
    }

    pub fn with_ledger(mut self, ledger: Arc<CommitLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Replace the reported capacities. The next read sees the new pools.
    pub fn set_template(&self, template: ResourceSnapshot) {
        debug!(pools = template.pools.len(), "static probe capacities replaced");
        self.template.store(Arc::new(template));
    }
}

#[async_trait]
impl Adapter for StaticProbe {
    fn name(&self) -> &str {
        "static"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Probe
    }
}

#[async_trait]
impl ResourceProbe for StaticProbe {
    async fn read(&self) -> Result<ResourceSnapshot, DirectorError> {
        let mut snapshot = ResourceSnapshot::clone(&self.template.load());
        if let Some(ledger) = &self.ledger {
            for (pool, capacity) in snapshot.pools.iter_mut() {
                capacity.committed = ledger.committed(pool);
            }
        }
        snapshot.taken_at = Utc::now();
        Ok(snapshot)
    }
}

/// Reports host memory as a single pool measured in MiB.
///
/// `total` is physical memory and `committed` is whatever is not currently
/// available, so `available()` tracks the OS view of free memory.
pub struct HostMemoryProbe {
    pool: PoolId,
    system: Arc<Mutex<sysinfo::System>>,
}

impl HostMemoryProbe {
    pub fn new(pool: impl Into<PoolId>) -> Self {
        Self {
            pool: pool.into(),
            system: Arc::new(Mutex::new(sysinfo::System::new())),
        }
    }
}

#[async_trait]
impl Adapter for HostMemoryProbe {
    fn name(&self) -> &str {
        "host_memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Probe
    }
}

#[async_trait]
impl ResourceProbe for HostMemoryProbe {
    async fn read(&self) -> Result<ResourceSnapshot, DirectorError> {
        let system = Arc::clone(&self.system);
        let (total, available) = tokio::task::spawn_blocking(move || {
            let mut system = system
                .lock()
                .map_err(|_| DirectorError::probe("host memory probe lock poisoned"))?;
            system.refresh_memory();
            Ok::<_, DirectorError>((system.total_memory(), system.available_memory()))
        })
        .await
        .map_err(|e| DirectorError::Probe {
            message: "host memory read task failed".to_string(),
            source: Some(Box::new(e)),
        })??;

        let total_mib = total / BYTES_PER_MIB;
        let available_mib = available / BYTES_PER_MIB;
        Ok(ResourceSnapshot::empty().with_pool(
            self.pool.clone(),
            total_mib,
            total_mib.saturating_sub(available_mib),
        ))
    }
}

/// Probe selected by `[monitor] probe`.
pub fn probe_from_config(config: &DirectorConfig) -> Arc<dyn ResourceProbe> {
    match config.monitor.probe {
        ProbeKind::Static => Arc::new(StaticProbe::from_config(config)),
        ProbeKind::HostMemory => Arc::new(HostMemoryProbe::new(config.monitor.host_pool.as_str())),
    }
}
