// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Director routing engine.

use thiserror::Error;

use crate::job::{JobId, JobStatus};
use crate::types::{Capability, QualityTier};

/// The primary error type shared by the registry, router, dispatcher, and
/// collaborator adapters.
#[derive(Debug, Error)]
pub enum DirectorError {
    /// No quality tier is registered for the requested capability.
    #[error("unsupported capability `{capability}`")]
    UnsupportedCapability { capability: Capability },

    /// Every registered tier at or below the requested one needs more
    /// resource units than are currently available.
    #[error("resources exhausted for `{capability}` at tier {tier} and below")]
    ResourceExhausted {
        capability: Capability,
        tier: QualityTier,
    },

    /// No worker profile was ever registered for this exact key.
    #[error("no worker profile registered for `{capability}`/{tier}")]
    ProfileNotFound {
        capability: Capability,
        tier: QualityTier,
    },

    /// A job state change that the lifecycle does not allow.
    #[error("invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    /// Cancellation of a job that already finished.
    #[error("job {job_id} is already {status}")]
    AlreadyTerminal { job_id: JobId, status: JobStatus },

    /// The dispatcher has no record of this job.
    #[error("job {job_id} not found")]
    JobNotFound { job_id: JobId },

    /// Execution backend errors (hand-off refused, cancel request failed).
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Notification transport errors.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Resource probe read failures.
    #[error("probe error: {message}")]
    Probe {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors surfaced outside the config crate.
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DirectorError {
    /// Whether a caller may reasonably retry the same request later.
    ///
    /// Only resource exhaustion and timeouts clear up on their own; an
    /// unsupported capability or a lifecycle violation never will.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DirectorError::ResourceExhausted { .. } | DirectorError::Timeout { .. }
        )
    }

    /// Shorthand for a backend error without an underlying source.
    pub fn backend(message: impl Into<String>) -> Self {
        DirectorError::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a probe error without an underlying source.
    pub fn probe(message: impl Into<String>) -> Self {
        DirectorError::Probe {
            message: message.into(),
            source: None,
        }
    }
}
