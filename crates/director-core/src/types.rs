// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the registry, router, and dispatcher.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A named logical operation a client can request, e.g. `create_image`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(pub String);

impl Capability {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Capability {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Capability {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Service level trading output fidelity for resource cost.
///
/// Variant order defines the total ordering `Low < Standard < High`, which is
/// also the fallback ladder walked by the router.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Standard,
    High,
}

impl QualityTier {
    /// All tiers in ascending order.
    pub const ALL: [QualityTier; 3] = [QualityTier::Low, QualityTier::Standard, QualityTier::High];

    /// The next tier down the ladder, or `None` for [`QualityTier::Low`].
    pub fn lower(self) -> Option<QualityTier> {
        match self {
            QualityTier::Low => None,
            QualityTier::Standard => Some(QualityTier::Low),
            QualityTier::High => Some(QualityTier::Standard),
        }
    }
}

/// Identifies a pool of workers sharing one resource budget.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub String);

impl PoolId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PoolId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Expected wall-clock duration of one job, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DurationRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

/// A concrete backend configuration able to serve one (capability, tier) key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
    /// Internal model/backend identifier. Never exposed in notifications.
    pub backend_id: String,
    /// Pool whose capacity this profile draws from.
    pub pool: PoolId,
    /// Resource units (e.g. GiB of VRAM) one job needs.
    pub resource_cost: u64,
    /// Estimated duration range.
    pub duration: DurationRange,
    /// Higher wins when several profiles could serve the same tier.
    pub priority: i32,
}

impl WorkerProfile {
    /// Profile with zero priority and no duration estimate.
    pub fn new(backend_id: impl Into<String>, pool: impl Into<PoolId>, resource_cost: u64) -> Self {
        Self {
            backend_id: backend_id.into(),
            pool: pool.into(),
            resource_cost,
            duration: DurationRange::default(),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_duration(mut self, min_secs: u64, max_secs: u64) -> Self {
        self.duration = DurationRange { min_secs, max_secs };
        self
    }
}

/// Total and committed resource units of one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCapacity {
    pub total: u64,
    pub committed: u64,
}

impl PoolCapacity {
    /// Units still free. Over-commitment reads as zero, never negative.
    pub fn available(&self) -> u64 {
        self.total.saturating_sub(self.committed)
    }
}

/// Point-in-time view of every pool's capacity.
///
/// Built once per probe read and then shared immutably; the monitor replaces
/// the whole value, never patches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub pools: BTreeMap<PoolId, PoolCapacity>,
    pub taken_at: DateTime<Utc>,
}

impl ResourceSnapshot {
    /// A snapshot with no pool readings, taken now.
    pub fn empty() -> Self {
        Self {
            pools: BTreeMap::new(),
            taken_at: Utc::now(),
        }
    }

    /// Add (or overwrite) one pool reading.
    pub fn with_pool(mut self, pool: impl Into<PoolId>, total: u64, committed: u64) -> Self {
        self.pools
            .insert(pool.into(), PoolCapacity { total, committed });
        self
    }

    /// Free units in `pool`, or `None` when the snapshot has no reading for it.
    pub fn available(&self, pool: &PoolId) -> Option<u64> {
        self.pools.get(pool).map(PoolCapacity::available)
    }

    /// How long ago this snapshot was taken.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.taken_at)
    }
}

impl Default for ResourceSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Why the router accepted a tier other than the one requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The requested tier was served as asked.
    None,
    /// The requested tier exists but its pool lacks free units.
    InsufficientResources,
    /// The requested tier has no profile, or no reading for its pools.
    WorkerUnavailable,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::None => write!(f, "none"),
            FallbackReason::InsufficientResources => write!(f, "insufficient_resources"),
            FallbackReason::WorkerUnavailable => write!(f, "worker_unavailable"),
        }
    }
}

/// Ephemeral routing verdict handed to the dispatcher and the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackDecision {
    pub accepted_tier: QualityTier,
    pub original_tier: QualityTier,
    pub reason: FallbackReason,
}

impl FallbackDecision {
    /// Decision for a request served at the tier it asked for.
    pub fn exact(tier: QualityTier) -> Self {
        Self {
            accepted_tier: tier,
            original_tier: tier,
            reason: FallbackReason::None,
        }
    }

    pub fn is_downgrade(&self) -> bool {
        self.accepted_tier < self.original_tier
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

/// The kind of external collaborator an adapter stands in for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Backend,
    Transport,
    Probe,
}
