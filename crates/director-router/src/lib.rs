// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quality-tier routing for the Director engine.
//!
//! Maps a (capability, requested tier) request to a worker profile using a
//! copy-on-write [`TierRegistry`] and a [`ResourceSnapshot`] held by the
//! [`ResourceMonitor`]. When the requested tier does not fit, the
//! [`TierRouter`] falls back to the highest lower tier that does.
//!
//! [`ResourceSnapshot`]: director_core::ResourceSnapshot

pub mod monitor;
pub mod probe;
pub mod registry;
pub mod router;

pub use monitor::ResourceMonitor;
pub use probe::{CommitLedger, HostMemoryProbe, StaticProbe, probe_from_config};
pub use registry::{RegistryView, TierRegistry};
pub use router::{Route, TierRouter};
