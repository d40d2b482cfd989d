// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification transport trait.

use async_trait::async_trait;

use crate::error::DirectorError;
use crate::event::JobEvent;
use crate::traits::adapter::Adapter;

/// Delivers job events to whatever is listening (a push channel, a log).
#[async_trait]
pub trait NotificationTransport: Adapter {
    async fn publish(&self, event: JobEvent) -> Result<(), DirectorError>;
}
