// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution backend trait.

use async_trait::async_trait;

use crate::error::DirectorError;
use crate::job::JobId;
use crate::traits::adapter::Adapter;
use crate::types::WorkerProfile;

/// The model-serving layer that actually runs generation jobs.
///
/// `execute` returns as soon as the job is accepted. The backend then reports
/// through the dispatcher's `on_backend_started`, `on_backend_progress` and
/// `on_backend_complete` callbacks, keyed by `job_id`. The completion callback
/// must eventually fire for every accepted job; duplicates are tolerated.
#[async_trait]
pub trait ExecutionBackend: Adapter {
    /// Hand a routed job to the backend.
    async fn execute(
        &self,
        job_id: JobId,
        profile: &WorkerProfile,
        payload: serde_json::Value,
    ) -> Result<(), DirectorError>;

    /// Ask the backend to stop working on a job. Cooperative only.
    async fn cancel(&self, job_id: JobId) -> Result<(), DirectorError>;
}
