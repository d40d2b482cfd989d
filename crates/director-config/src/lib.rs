// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Director routing engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, `DIRECTOR_*`
//! environment overrides, and miette diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use director_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("{} profiles", config.profiles.len());
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

use tracing::debug;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    DirectorConfig, DispatchConfig, MetricsConfig, MonitorConfig, NotifyConfig, PoolConfig,
    ProbeKind, ProfileConfig, ServiceConfig,
};

/// Load configuration from the XDG hierarchy and validate it.
pub fn load_and_validate() -> Result<DirectorConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => checked("xdg", config),
        Err(err) => rejected(
            "xdg",
            diagnostic::figment_to_config_errors(err, &collect_toml_sources()),
        ),
    }
}

/// Load configuration from one explicit file and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<DirectorConfig, Vec<ConfigError>> {
    let source = path.display().to_string();
    match loader::load_config_from_path(path) {
        Ok(config) => checked(&source, config),
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![(source.clone(), content)])
                .unwrap_or_default();
            rejected(&source, diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<DirectorConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => checked("<inline>", config),
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            rejected("<inline>", diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn checked(source: &str, config: DirectorConfig) -> Result<DirectorConfig, Vec<ConfigError>> {
    if let Err(errors) = validation::validate_config(&config) {
        return rejected(source, errors);
    }
    debug!(
        source,
        pools = config.pools.len(),
        profiles = config.profiles.len(),
        probe = ?config.monitor.probe,
        "configuration loaded"
    );
    Ok(config)
}

fn rejected(source: &str, errors: Vec<ConfigError>) -> Result<DirectorConfig, Vec<ConfigError>> {
    debug!(source, errors = errors.len(), "configuration rejected");
    Err(errors)
}

/// Read every config file in the hierarchy that exists, for span lookup.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut candidates = vec![std::path::PathBuf::from(loader::SYSTEM_CONFIG_PATH)];
    if let Some(user) = loader::user_config_path() {
        candidates.push(user);
    }
    candidates.push(
        std::env::current_dir()
            .map(|d| d.join(loader::LOCAL_CONFIG_FILE))
            .unwrap_or_else(|_| loader::LOCAL_CONFIG_FILE.into()),
    );

    candidates
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}
