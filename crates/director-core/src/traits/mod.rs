// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Every external collaborator extends the [`Adapter`] base trait and uses
//! `#[async_trait]` so implementations can sit behind `Arc<dyn ...>`.

pub mod adapter;
pub mod backend;
pub mod probe;
pub mod transport;

pub use adapter::Adapter;
pub use backend::ExecutionBackend;
pub use probe::ResourceProbe;
pub use transport::NotificationTransport;
