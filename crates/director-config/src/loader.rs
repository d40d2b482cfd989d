// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. `/etc/director/director.toml`
//! 3. `~/.config/director/director.toml`
//! 4. `./director.toml`
//! 5. `DIRECTOR_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::DirectorConfig;

/// System-wide config path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/director/director.toml";

/// Config file name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "director.toml";

/// Sections whose scalar keys may be overridden from the environment.
const ENV_SECTIONS: &[&str] = &["service", "monitor", "dispatch", "notify", "metrics"];

/// Per-user config path under the XDG config directory, if one exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("director").join(LOCAL_CONFIG_FILE))
}

/// The full Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(DirectorConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<DirectorConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an explicit file, still honouring env overrides.
///
/// Used by `--config` and by the hot-reload watcher.
pub fn load_config_from_path(path: &Path) -> Result<DirectorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DirectorConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<DirectorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DirectorConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// `DIRECTOR_*` provider with explicit section mapping.
///
/// Splitting on `_` would turn `DIRECTOR_MONITOR_REFRESH_INTERVAL_SECS` into
/// `monitor.refresh.interval.secs`; only the first segment names a section.
fn env_provider() -> Env {
    Env::prefixed("DIRECTOR_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a prefix-stripped env key onto a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}
