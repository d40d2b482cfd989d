// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Director routing engine.
//!
//! This crate provides the data model (capabilities, quality tiers, worker
//! profiles, resource snapshots, jobs), the shared error type, and the
//! traits external collaborators implement: execution backends,
//! notification transports and resource probes.

pub mod error;
pub mod event;
pub mod job;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::DirectorError;
pub use event::{EventKind, JobEvent, ReasonCode};
pub use job::{FailureKind, Job, JobFailure, JobId, JobStatus};
pub use types::{
    AdapterType, Capability, DurationRange, FallbackDecision, FallbackReason, HealthStatus,
    PoolCapacity, PoolId, QualityTier, ResourceSnapshot, WorkerProfile,
};

pub use traits::{Adapter, ExecutionBackend, NotificationTransport, ResourceProbe};
