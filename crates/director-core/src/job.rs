// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The job record and its lifecycle state machine.
//!
//! ```text
//! Queued ──► Running ──► Succeeded
//!   │  │        │  └───► Failed
//!   │  │        └──────► Cancelled
//!   │  └───────────────► Failed     (backend refused the hand-off)
//!   └──────────────────► Cancelled
//! ```
//!
//! Terminal states never transition again.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DirectorError;
use crate::types::{Capability, FallbackDecision, FallbackReason, QualityTier, WorkerProfile};

/// Unique identifier of a routed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub uuid::Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Cancelled)
                | (Queued, Failed)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

/// Category of a job failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedCapability,
    ResourceExhausted,
    BackendRejected,
    BackendError,
}

/// Why a job ended in [`JobStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    /// Failure record for a routing error returned to `submit`.
    ///
    /// Returns `None` for errors the router never produces.
    pub fn from_routing_error(err: &DirectorError) -> Option<Self> {
        let kind = match err {
            DirectorError::UnsupportedCapability { .. } => FailureKind::UnsupportedCapability,
            DirectorError::ResourceExhausted { .. } => FailureKind::ResourceExhausted,
            _ => return None,
        };
        Some(Self {
            kind,
            message: err.to_string(),
        })
    }
}

/// One tracked unit of routed work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub capability: Capability,
    pub requested_tier: QualityTier,
    /// Tier actually granted; `None` when routing failed.
    pub resolved_tier: Option<QualityTier>,
    /// Profile chosen by the router; `None` when routing failed.
    pub profile: Option<Arc<WorkerProfile>>,
    pub status: JobStatus,
    /// Last reported progress percentage. Informational only.
    pub progress: u8,
    /// Set when the granted tier differs from the requested one.
    pub fallback_reason: Option<FallbackReason>,
    pub failure: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A routed job waiting for the backend to pick it up.
    pub fn queued(
        capability: Capability,
        requested_tier: QualityTier,
        profile: Arc<WorkerProfile>,
        decision: &FallbackDecision,
    ) -> Self {
        let fallback_reason = if decision.reason == FallbackReason::None {
            None
        } else {
            Some(decision.reason)
        };
        Self {
            id: JobId::new(),
            capability,
            requested_tier,
            resolved_tier: Some(decision.accepted_tier),
            profile: Some(profile),
            status: JobStatus::Queued,
            progress: 0,
            fallback_reason,
            failure: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// A job that failed before it could be queued, so the failure is still
    /// observable through the normal job lifecycle.
    pub fn rejected(
        capability: Capability,
        requested_tier: QualityTier,
        failure: JobFailure,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            capability,
            requested_tier,
            resolved_tier: None,
            profile: None,
            status: JobStatus::Failed,
            progress: 0,
            fallback_reason: None,
            failure: Some(failure),
            created_at: now,
            started_at: None,
            finished_at: Some(now),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move the job to `next`, stamping the matching timestamp.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), DirectorError> {
        if !self.status.can_transition_to(next) {
            return Err(DirectorError::InvalidTransition {
                job_id: self.id,
                from: self.status,
                to: next,
            });
        }
        let now = Utc::now();
        if next == JobStatus::Running {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.finished_at = Some(now);
            if next == JobStatus::Succeeded {
                self.progress = 100;
            }
        }
        self.status = next;
        Ok(())
    }

    /// Move to `Failed` and record why.
    pub fn fail(&mut self, failure: JobFailure) -> Result<(), DirectorError> {
        self.transition(JobStatus::Failed)?;
        self.failure = Some(failure);
        Ok(())
    }
}
