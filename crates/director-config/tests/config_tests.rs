// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Director configuration system.

use director_config::diagnostic::ConfigError;
use director_config::{
    ProbeKind, load_and_validate, load_and_validate_path, load_and_validate_str,
    load_config_from_str,
};
use director_core::{Capability, QualityTier};

const TIER_TABLE: &str = r#"
[service]
name = "director-test"
log_level = "debug"

[monitor]
refresh_interval_secs = 2
refresh_timeout_ms = 500

[[pools]]
name = "gpu"
total_units = 24

[[profiles]]
capability = "create_image"
tier = "high"
backend_id = "sdxl-refiner"
pool = "gpu"
resource_cost = 16
min_duration_secs = 20
max_duration_secs = 60

[[profiles]]
capability = "create_image"
tier = "standard"
backend_id = "sdxl"
pool = "gpu"
resource_cost = 10

[[profiles]]
capability = "create_image"
tier = "low"
backend_id = "sd-turbo"
pool = "gpu"
resource_cost = 4
"#;

#[test]
fn tier_table_loads_and_validates() {
    let config = load_and_validate_str(TIER_TABLE).expect("tier table should be valid");
    assert_eq!(config.service.name, "director-test");
    assert_eq!(config.monitor.refresh_interval_secs, 2);
    assert_eq!(config.monitor.probe, ProbeKind::Static);
    assert_eq!(config.dispatch.retention_secs, 3600);

    let entries = config.registry_entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].0, Capability::from("create_image"));
    assert_eq!(entries[0].1, QualityTier::High);
    assert_eq!(entries[0].2.duration.max_secs, 60);
}

#[test]
fn empty_config_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should load");
    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.monitor.refresh_timeout_ms, 2000);
    assert_eq!(config.notify.channel_capacity, 256);
    assert!(!config.metrics.enabled);
    assert!(config.profiles.is_empty());
}

#[test]
fn typo_in_section_key_suggests_fix() {
    let toml = r#"
[monitor]
refresh_intervl_secs = 3
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "refresh_intervl_secs");
            assert_eq!(suggestion.as_deref(), Some("refresh_interval_secs"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn typo_inside_profile_entry_gets_span() {
    let toml = r#"
[[profiles]]
capability = "create_image"
tier = "high"
backed_id = "sdxl"
pool = "gpu"
resource_cost = 16
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    let unknown = errors
        .iter()
        .find(|e| matches!(e, ConfigError::UnknownKey { .. }))
        .expect("should report the unknown key");
    if let ConfigError::UnknownKey {
        suggestion, span, ..
    } = unknown
    {
        assert_eq!(suggestion.as_deref(), Some("backend_id"));
        let span = span.expect("inline source should give a span");
        assert_eq!(&toml[span.offset()..span.offset() + span.len()], "backed_id");
    }
}

#[test]
fn unknown_tier_is_an_invalid_value() {
    let toml = r#"
[[profiles]]
capability = "create_image"
tier = "ultra"
backend_id = "sdxl"
pool = "gpu"
resource_cost = 16
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidValue { .. })),
        "got: {errors:?}"
    );
}

#[test]
fn semantic_errors_are_all_reported() {
    let toml = r#"
[service]
log_level = "loud"

[[profiles]]
capability = ""
tier = "low"
backend_id = "sd-turbo"
pool = "missing"
resource_cost = 4
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 3, "got: {errors:?}");
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

#[test]
fn explicit_path_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiers.toml");
    std::fs::write(&path, TIER_TABLE).unwrap();

    let config = load_and_validate_path(&path).expect("file should load");
    assert_eq!(config.profiles.len(), 3);
}

#[test]
fn explicit_path_errors_point_into_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiers.toml");
    std::fs::write(&path, "[dispatch]\nretension_secs = 10\n").unwrap();

    let errors = load_and_validate_path(&path).unwrap_err();
    match &errors[0] {
        ConfigError::UnknownKey { span, src, .. } => {
            assert!(span.is_some());
            assert!(src.is_some());
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn env_overrides_local_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("director.toml", TIER_TABLE)?;
        jail.set_env("DIRECTOR_MONITOR_REFRESH_INTERVAL_SECS", "9");
        jail.set_env("DIRECTOR_SERVICE_LOG_LEVEL", "warn");

        let config = load_and_validate().map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.monitor.refresh_interval_secs, 9);
        assert_eq!(config.service.log_level, "warn");
        assert_eq!(config.profiles.len(), 3);
        Ok(())
    });
}
