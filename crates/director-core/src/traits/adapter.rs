// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by all collaborator adapters.

use async_trait::async_trait;

use crate::error::DirectorError;
use crate::types::{AdapterType, HealthStatus};

/// Identity and health surface common to backends, transports and probes.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Which collaborator role this adapter fills.
    fn adapter_type(&self) -> AdapterType;

    /// Reports the adapter's current health. Defaults to healthy.
    async fn health_check(&self) -> Result<HealthStatus, DirectorError> {
        Ok(HealthStatus::Healthy)
    }
}
