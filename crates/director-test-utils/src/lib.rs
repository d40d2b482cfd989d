// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Director integration tests.
//!
//! Provides mock collaborators and a harness for fast, deterministic tests
//! without real model backends or hardware probes.
//!
//! # Components
//!
//! - [`MockBackend`] - Records hand-offs and cancels, refuses on demand
//! - [`RecordingTransport`] - Keeps every published event
//! - [`ScriptedProbe`] - Resource readings set by the test
//! - [`TestHarness`] - The full routing stack wired to the mocks above

pub mod harness;
pub mod mock_backend;
pub mod recording_transport;
pub mod scripted_probe;

pub use harness::{DEFAULT_POOL, TestHarness, TestHarnessBuilder};
pub use mock_backend::{Execution, MockBackend};
pub use recording_transport::RecordingTransport;
pub use scripted_probe::ScriptedProbe;
