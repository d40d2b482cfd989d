// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tier selection with resource-aware fallback.
//!
//! Walks the registered tiers from the requested one downward and picks the
//! first candidate whose pool has room. Never climbs above the requested
//! tier, never waits, never retries.

use std::sync::Arc;

use director_core::{
    Capability, DirectorError, FallbackDecision, FallbackReason, QualityTier, ResourceSnapshot,
    WorkerProfile,
};
use tracing::{debug, info};

use crate::registry::TierRegistry;

/// A routing verdict: which profile serves the job, and at which tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub profile: Arc<WorkerProfile>,
    pub decision: FallbackDecision,
}

/// Stateless resolver over a shared [`TierRegistry`].
///
/// The result depends only on the registry contents and the snapshot passed
/// in, so the same inputs always yield the same [`Route`].
#[derive(Debug, Clone)]
pub struct TierRouter {
    registry: Arc<TierRegistry>,
}

impl TierRouter {
    pub fn new(registry: Arc<TierRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TierRegistry> {
        &self.registry
    }

    /// Pick the highest registered tier at or below `requested` that fits in
    /// `snapshot`.
    ///
    /// A candidate fits when the snapshot has a reading for its pool and its
    /// cost does not exceed the free units there. Candidates within one tier
    /// are tried in selection order (priority, then registration).
    ///
    /// # Errors
    ///
    /// - [`DirectorError::UnsupportedCapability`] when no tier is registered
    ///   for `capability`.
    /// - [`DirectorError::ResourceExhausted`] when no tier at or below
    ///   `requested` fits.
    pub fn resolve(
        &self,
        capability: &Capability,
        requested: QualityTier,
        snapshot: &ResourceSnapshot,
    ) -> Result<Route, DirectorError> {
        let view = self.registry.view();
        let tiers = view.tiers(capability);
        if tiers.is_empty() {
            debug!(capability = %capability, "no tiers registered");
            return Err(DirectorError::UnsupportedCapability {
                capability: capability.clone(),
            });
        }

        // Set once a requested-tier candidate was measured and found too big.
        let mut requested_had_reading = false;

        for tier in tiers.into_iter().rev().filter(|t| *t <= requested) {
            for profile in view.candidates(capability, tier) {
                let Some(available) = snapshot.available(&profile.pool) else {
                    debug!(
                        capability = %capability,
                        tier = %tier,
                        pool = %profile.pool,
                        "no reading for pool, skipping candidate"
                    );
                    continue;
                };
                if tier == requested {
                    requested_had_reading = true;
                }
                if profile.resource_cost > available {
                    continue;
                }

                let reason = if tier == requested {
                    FallbackReason::None
                } else if requested_had_reading {
                    FallbackReason::InsufficientResources
                } else {
                    FallbackReason::WorkerUnavailable
                };
                let decision = FallbackDecision {
                    accepted_tier: tier,
                    original_tier: requested,
                    reason,
                };

                if decision.is_downgrade() {
                    info!(
                        capability = %capability,
                        requested = %requested,
                        accepted = %tier,
                        reason = %reason,
                        backend = profile.backend_id.as_str(),
                        cost = profile.resource_cost,
                        available,
                        "tier downgrade"
                    );
                }
                return Ok(Route { profile, decision });
            }
        }

        info!(
            capability = %capability,
            requested = %requested,
            "resources exhausted at every eligible tier"
        );
        Err(DirectorError::ResourceExhausted {
            capability: capability.clone(),
            tier: requested,
        })
    }
}
