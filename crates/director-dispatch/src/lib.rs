// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job dispatch and client notifications for the Director engine.
//!
//! - [`Dispatcher`]: routes submissions, drives each job's lifecycle from
//!   backend callbacks, and keeps the job table.
//! - [`NotificationEmitter`]: turns job changes into neutral
//!   [`JobEvent`](director_core::JobEvent)s for a transport.

pub mod dispatcher;
pub mod metrics;
pub mod notify;

pub use dispatcher::{CompletionOutcome, Dispatcher, JobCounts};
pub use notify::{BroadcastTransport, JsonLinesTransport, NotificationEmitter, NullTransport};
