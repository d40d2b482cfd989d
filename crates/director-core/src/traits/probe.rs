// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resource probe trait.

use async_trait::async_trait;

use crate::error::DirectorError;
use crate::traits::adapter::Adapter;
use crate::types::ResourceSnapshot;

/// Source of resource readings for the resource monitor.
///
/// A read may be slow or fail; the monitor bounds it with a timeout and keeps
/// its previous snapshot on error.
#[async_trait]
pub trait ResourceProbe: Adapter {
    async fn read(&self) -> Result<ResourceSnapshot, DirectorError>;
}
