// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions and recording helpers.
//!
//! Recorded through the `metrics` facade; without an installed recorder every
//! call is a no-op.

use director_core::{Capability, FallbackReason, FailureKind, JobStatus};
use metrics::{describe_counter, describe_gauge};

/// Register descriptions for every Director metric.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "director_jobs_submitted_total",
        "Jobs submitted, by capability"
    );
    describe_counter!(
        "director_fallbacks_total",
        "Jobs accepted below their requested tier, by capability and reason"
    );
    describe_counter!(
        "director_jobs_finished_total",
        "Jobs that reached a terminal state, by status"
    );
    describe_counter!(
        "director_routing_failures_total",
        "Submissions the router could not place, by failure kind"
    );
    describe_counter!(
        "director_snapshot_refresh_failures_total",
        "Resource probe reads that failed or timed out"
    );
    describe_gauge!("director_jobs_active", "Jobs currently queued or running");
}

pub fn record_submitted(capability: &Capability) {
    metrics::counter!("director_jobs_submitted_total", "capability" => capability.to_string())
        .increment(1);
}

pub fn record_fallback(capability: &Capability, reason: FallbackReason) {
    metrics::counter!(
        "director_fallbacks_total",
        "capability" => capability.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn record_finished(status: JobStatus) {
    metrics::counter!("director_jobs_finished_total", "status" => status.to_string()).increment(1);
}

pub fn record_routing_failure(kind: FailureKind) {
    metrics::counter!("director_routing_failures_total", "kind" => kind.to_string()).increment(1);
}

pub fn set_active_jobs(count: usize) {
    metrics::gauge!("director_jobs_active").set(count as f64);
}
