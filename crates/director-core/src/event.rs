// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External-facing job events.
//!
//! A [`JobEvent`] carries only what a client may see: the capability, the
//! requested and granted tiers, and a coarse [`ReasonCode`]. Backend
//! identifiers, pool names and resource units never appear here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::job::{JobId, JobStatus};
use crate::types::{Capability, QualityTier};

/// What happened to the job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Queued,
    /// The job was accepted at a lower tier than requested.
    Downgraded,
    Started,
    Progress,
    Succeeded,
    Failed,
    Cancelled,
}

/// Coarse, user-facing explanation attached to an event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    #[strum(serialize = "none")]
    #[serde(rename = "none")]
    NoReason,
    ReducedQuality,
    CapacityUnavailable,
    Unsupported,
    GenerationFailed,
    Cancelled,
}

/// Logical notification payload. Wire encoding belongs to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub kind: EventKind,
    pub status: JobStatus,
    pub capability: Capability,
    pub requested_tier: QualityTier,
    pub resolved_tier: Option<QualityTier>,
    pub reason_code: ReasonCode,
    /// Neutral, human-readable summary.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    pub emitted_at: DateTime<Utc>,
}
