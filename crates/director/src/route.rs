// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `director route`: one-shot routing decision against the configured tier
//! table.

use std::sync::Arc;

use serde::Serialize;

use director_config::DirectorConfig;
use director_core::{Capability, DirectorError, FallbackReason, QualityTier, ResourceSnapshot};
use director_router::{Route, TierRegistry, TierRouter};

/// Parse one `--available pool=units` argument.
pub fn parse_available(arg: &str) -> Result<(String, u64), String> {
    let (pool, units) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected POOL=UNITS, got `{arg}`"))?;
    let pool = pool.trim();
    if pool.is_empty() {
        return Err("pool name must not be empty".to_string());
    }
    let units = units
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid units for pool `{pool}`: {e}"))?;
    Ok((pool.to_string(), units))
}

/// Declared pool capacities, with `overrides` replacing the free units of
/// the named pools.
pub fn snapshot_with_overrides(
    config: &DirectorConfig,
    overrides: &[(String, u64)],
) -> ResourceSnapshot {
    overrides
        .iter()
        .fold(config.static_snapshot(), |snapshot, (pool, units)| {
            snapshot.with_pool(pool.as_str(), *units, 0)
        })
}

/// Routing verdict as printed by `--json`.
#[derive(Debug, Serialize)]
pub struct RouteReport {
    pub capability: Capability,
    pub requested_tier: QualityTier,
    pub accepted_tier: QualityTier,
    pub reason: FallbackReason,
    pub backend_id: String,
    pub pool: String,
    pub resource_cost: u64,
}

impl RouteReport {
    fn new(capability: Capability, route: &Route) -> Self {
        Self {
            capability,
            requested_tier: route.decision.original_tier,
            accepted_tier: route.decision.accepted_tier,
            reason: route.decision.reason,
            backend_id: route.profile.backend_id.clone(),
            pool: route.profile.pool.to_string(),
            resource_cost: route.profile.resource_cost,
        }
    }

    /// One-line operator summary.
    pub fn render(&self) -> String {
        let mut line = format!(
            "{}/{} -> {} via {} (pool {}, cost {})",
            self.capability,
            self.requested_tier,
            self.accepted_tier,
            self.backend_id,
            self.pool,
            self.resource_cost
        );
        if self.reason != FallbackReason::None {
            line.push_str(&format!(", fallback: {}", self.reason));
        }
        line
    }
}

/// Resolve `capability` at `tier` against the config's profiles and a
/// snapshot built from its pools plus `overrides`.
pub fn route_once(
    config: &DirectorConfig,
    capability: &str,
    tier: QualityTier,
    overrides: &[(String, u64)],
) -> Result<RouteReport, DirectorError> {
    let registry = Arc::new(TierRegistry::from_entries(config.registry_entries()));
    let router = TierRouter::new(registry);
    let snapshot = snapshot_with_overrides(config, overrides);

    let capability = Capability::new(capability);
    let route = router.resolve(&capability, tier, &snapshot)?;
    Ok(RouteReport::new(capability, &route))
}

/// Entry point for the subcommand. Returns the process exit code.
pub fn run_route(
    config: &DirectorConfig,
    capability: &str,
    tier: QualityTier,
    overrides: &[(String, u64)],
    json: bool,
) -> i32 {
    match route_once(config, capability, tier, overrides) {
        Ok(report) if json => match serde_json::to_string_pretty(&report) {
            Ok(out) => {
                println!("{out}");
                0
            }
            Err(e) => {
                eprintln!("error: failed to encode route: {e}");
                1
            }
        },
        Ok(report) => {
            println!("{}", report.render());
            0
        }
        Err(e) => {
            if json {
                let out = serde_json::json!({ "error": e.to_string() });
                println!("{out}");
            } else {
                eprintln!("error: {e}");
            }
            2
        }
    }
}
