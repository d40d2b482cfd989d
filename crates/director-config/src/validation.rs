// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Checks the constraints serde cannot express: pool references, unique tier
//! table keys, capacity bounds. Every rule runs; errors are collected rather
//! than returned on the first failure.

use std::collections::{HashMap, HashSet};

use crate::diagnostic::ConfigError;
use crate::model::DirectorConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &DirectorConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.service.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "service.log_level `{}` is not one of: {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.monitor.refresh_interval_secs < 1 {
        errors.push(ConfigError::validation(
            "monitor.refresh_interval_secs must be at least 1",
        ));
    }
    if config.monitor.refresh_timeout_ms == 0 {
        errors.push(ConfigError::validation(
            "monitor.refresh_timeout_ms must be greater than 0",
        ));
    }
    if config.monitor.host_pool.trim().is_empty() {
        errors.push(ConfigError::validation("monitor.host_pool must not be empty"));
    }

    if config.notify.channel_capacity == 0 {
        errors.push(ConfigError::validation(
            "notify.channel_capacity must be greater than 0",
        ));
    }

    if config.metrics.enabled && config.metrics.listen.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ConfigError::validation(format!(
            "metrics.listen `{}` is not a valid socket address",
            config.metrics.listen
        )));
    }

    validate_pools(config, &mut errors);
    validate_profiles(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_pools(config: &DirectorConfig, errors: &mut Vec<ConfigError>) {
    let mut seen = HashSet::new();
    for (index, pool) in config.pools.iter().enumerate() {
        if pool.name.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "pools[{index}].name must not be empty"
            )));
            continue;
        }
        if !seen.insert(pool.name.as_str()) {
            errors.push(ConfigError::validation(format!(
                "pool `{}` is declared more than once",
                pool.name
            )));
        }
        if pool.total_units == 0 {
            errors.push(ConfigError::validation(format!(
                "pool `{}` must have total_units greater than 0",
                pool.name
            )));
        }
    }
}

fn validate_profiles(config: &DirectorConfig, errors: &mut Vec<ConfigError>) {
    // First declaration wins; duplicates are reported by validate_pools.
    let mut capacities: HashMap<&str, u64> = HashMap::new();
    for pool in &config.pools {
        capacities.entry(pool.name.as_str()).or_insert(pool.total_units);
    }
    // Host memory pool is sized at runtime; only its name is checked.
    let host_pool = config.monitor.host_pool.as_str();

    let mut keys = HashSet::new();
    for (index, profile) in config.profiles.iter().enumerate() {
        let at = format!("profiles[{index}]");

        if profile.capability.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "{at}.capability must not be empty"
            )));
        }
        if profile.backend_id.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "{at}.backend_id must not be empty"
            )));
        }

        match capacities.get(profile.pool.as_str()) {
            Some(&total) if profile.resource_cost > total => {
                errors.push(ConfigError::validation(format!(
                    "{at}: resource_cost {} exceeds pool `{}` capacity {total}, so `{}` could never run",
                    profile.resource_cost, profile.pool, profile.backend_id
                )));
            }
            Some(_) => {}
            None if profile.pool == host_pool => {}
            None => {
                errors.push(ConfigError::validation(format!(
                    "{at}: pool `{}` is not declared in [[pools]]",
                    profile.pool
                )));
            }
        }

        if profile.min_duration_secs > profile.max_duration_secs {
            errors.push(ConfigError::validation(format!(
                "{at}: min_duration_secs {} is greater than max_duration_secs {}",
                profile.min_duration_secs, profile.max_duration_secs
            )));
        }

        let key = (
            profile.capability.as_str(),
            profile.tier,
            profile.backend_id.as_str(),
        );
        if !keys.insert(key) {
            errors.push(ConfigError::validation(format!(
                "backend `{}` is registered twice for `{}`/{}",
                profile.backend_id, profile.capability, profile.tier
            )));
        }
    }
}
