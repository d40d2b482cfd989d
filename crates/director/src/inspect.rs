// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `director check` and `director tiers`.

use std::fmt::Write as _;

use director_config::DirectorConfig;
use director_core::Capability;
use director_router::TierRegistry;

/// Summary printed once the configuration has loaded and validated.
pub fn check_summary(config: &DirectorConfig) -> String {
    let registry = TierRegistry::from_entries(config.registry_entries());
    let mut out = String::new();

    let _ = writeln!(
        out,
        "config ok: {} pool(s), {} profile(s), {} capability(ies)",
        config.pools.len(),
        registry.len(),
        registry.capabilities().len()
    );
    for pool in &config.pools {
        let _ = writeln!(out, "  pool {}: {} units", pool.name, pool.total_units);
    }
    let _ = writeln!(
        out,
        "  monitor: {:?} probe, refresh every {}s, timeout {}ms",
        config.monitor.probe,
        config.monitor.refresh_interval_secs,
        config.monitor.refresh_timeout_ms
    );
    if config.metrics.enabled {
        let _ = writeln!(out, "  metrics: {}", config.metrics.listen);
    } else {
        let _ = writeln!(out, "  metrics: disabled");
    }
    out
}

/// Tier table, one row per registered profile. The first profile listed
/// for a key is the active one.
pub fn tier_table(config: &DirectorConfig, only: Option<&str>) -> String {
    let registry = TierRegistry::from_entries(config.registry_entries());
    let view = registry.view();
    let mut out = String::new();

    let capabilities: Vec<Capability> = match only {
        Some(name) => vec![Capability::new(name)],
        None => registry.capabilities(),
    };

    let _ = writeln!(
        out,
        "{:<20} {:<9} {:<20} {:<10} {:>5} {:>8}",
        "CAPABILITY", "TIER", "BACKEND", "POOL", "COST", "PRIORITY"
    );
    for capability in &capabilities {
        let tiers = view.tiers(capability);
        if tiers.is_empty() {
            let _ = writeln!(out, "{capability:<20} (no tiers registered)");
            continue;
        }
        for tier in tiers {
            for (idx, profile) in view.candidates(capability, tier).iter().enumerate() {
                let marker = if idx == 0 { "" } else { " (alternate)" };
                let _ = writeln!(
                    out,
                    "{:<20} {:<9} {:<20} {:<10} {:>5} {:>8}{marker}",
                    capability.as_str(),
                    tier.to_string(),
                    profile.backend_id,
                    profile.pool.as_str(),
                    profile.resource_cost,
                    profile.priority,
                );
            }
        }
    }
    out
}
