// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a mistyped key fails at
//! startup instead of silently falling back to a default.

use director_core::{Capability, PoolId, QualityTier, ResourceSnapshot, WorkerProfile};
use serde::{Deserialize, Serialize};

/// Top-level Director configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DirectorConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Resource monitor refresh settings.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Job dispatcher settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Notification settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Worker pools and their capacity in resource units.
    #[serde(default)]
    pub pools: Vec<PoolConfig>,

    /// Tier table: which backend serves each (capability, tier) key.
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
}

impl DirectorConfig {
    /// Tier registry input derived from `[[profiles]]`, in file order.
    pub fn registry_entries(&self) -> Vec<(Capability, QualityTier, WorkerProfile)> {
        self.profiles
            .iter()
            .map(|p| (Capability::new(&p.capability), p.tier, p.to_worker_profile()))
            .collect()
    }

    /// Snapshot of the declared pools with nothing committed.
    pub fn static_snapshot(&self) -> ResourceSnapshot {
        self.pools
            .iter()
            .fold(ResourceSnapshot::empty(), |snapshot, pool| {
                snapshot.with_pool(PoolId::new(&pool.name), pool.total_units, 0)
            })
    }

    /// Look up a declared pool by name.
    pub fn pool(&self, name: &str) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| p.name == name)
    }
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "director".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where the resource monitor gets its readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Fixed capacities from `[[pools]]`.
    #[default]
    Static,
    /// Host available memory in MiB, reported as a single pool.
    HostMemory,
}

/// Resource monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Seconds between background refreshes.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Upper bound on one probe read, in milliseconds. A slower read keeps
    /// the previous snapshot.
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,

    /// Probe implementation.
    #[serde(default)]
    pub probe: ProbeKind,

    /// Pool name reported by the `host_memory` probe.
    #[serde(default = "default_host_pool")]
    pub host_pool: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            refresh_timeout_ms: default_refresh_timeout_ms(),
            probe: ProbeKind::default(),
            host_pool: default_host_pool(),
        }
    }
}

fn default_refresh_interval_secs() -> u64 {
    5
}

fn default_refresh_timeout_ms() -> u64 {
    2000
}

fn default_host_pool() -> String {
    "host".to_string()
}

/// Job dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// How long finished jobs stay queryable before pruning, in seconds.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
        }
    }
}

fn default_retention_secs() -> u64 {
    3600 // 1 hour
}

/// Notification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Buffer size of the in-process broadcast channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Socket address the exporter listens on.
    #[serde(default = "default_metrics_listen")]
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

fn default_metrics_listen() -> String {
    "127.0.0.1:9464".to_string()
}

/// One `[[pools]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    pub name: String,

    /// Capacity in resource units (e.g. GiB of VRAM).
    pub total_units: u64,
}

/// One `[[profiles]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub capability: String,
    pub tier: QualityTier,
    pub backend_id: String,
    pub pool: String,
    pub resource_cost: u64,

    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub min_duration_secs: u64,

    #[serde(default)]
    pub max_duration_secs: u64,
}

impl ProfileConfig {
    pub fn to_worker_profile(&self) -> WorkerProfile {
        WorkerProfile::new(self.backend_id.clone(), PoolId::new(&self.pool), self.resource_cost)
            .with_priority(self.priority)
            .with_duration(self.min_duration_secs, self.max_duration_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_array_deserializes() {
        let toml_str = r#"
[[pools]]
name = "gpu"
total_units = 24

[[profiles]]
capability = "create_image"
tier = "high"
backend_id = "sdxl-refiner"
pool = "gpu"
resource_cost = 16
priority = 2

[[profiles]]
capability = "create_image"
tier = "low"
backend_id = "sd-turbo"
pool = "gpu"
resource_cost = 4
"#;
        let config: DirectorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pools.len(), 1);
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.profiles[0].tier, QualityTier::High);
        assert_eq!(config.profiles[0].priority, 2);
        assert_eq!(config.profiles[1].priority, 0);

        let entries = config.registry_entries();
        assert_eq!(entries[0].0, Capability::from("create_image"));
        assert_eq!(entries[0].2.backend_id, "sdxl-refiner");
        assert_eq!(entries[1].2.resource_cost, 4);
    }

    #[test]
    fn profiles_deny_unknown_fields() {
        let toml_str = r#"
[[profiles]]
capability = "create_image"
tier = "high"
backend_id = "sdxl"
pool = "gpu"
resource_cost = 16
vram = 16
"#;
        assert!(toml::from_str::<DirectorConfig>(toml_str).is_err());
    }

    #[test]
    fn unknown_tier_is_rejected() {
        let toml_str = r#"
[[profiles]]
capability = "create_image"
tier = "ultra"
backend_id = "sdxl"
pool = "gpu"
resource_cost = 16
"#;
        assert!(toml::from_str::<DirectorConfig>(toml_str).is_err());
    }

    #[test]
    fn static_snapshot_reports_declared_pools() {
        let config: DirectorConfig = toml::from_str(
            r#"
[[pools]]
name = "gpu"
total_units = 24

[[pools]]
name = "cpu"
total_units = 8
"#,
        )
        .unwrap();
        let snapshot = config.static_snapshot();
        assert_eq!(snapshot.available(&PoolId::from("gpu")), Some(24));
        assert_eq!(snapshot.available(&PoolId::from("cpu")), Some(8));
    }

    #[test]
    fn probe_kind_parses_snake_case() {
        let config: DirectorConfig = toml::from_str(
            r#"
[monitor]
probe = "host_memory"
"#,
        )
        .unwrap();
        assert_eq!(config.monitor.probe, ProbeKind::HostMemory);
        assert_eq!(config.monitor.host_pool, "host");
    }
}
