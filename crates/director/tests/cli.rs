// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the compiled `director` binary against temporary config files.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const CONFIG: &str = r#"
[service]
log_level = "warn"

[monitor]
refresh_interval_secs = 1

[[pools]]
name = "gpu"
total_units = 24

[[profiles]]
capability = "create_image"
tier = "low"
backend_id = "sd-turbo"
pool = "gpu"
resource_cost = 4
min_duration_secs = 1
max_duration_secs = 2

[[profiles]]
capability = "create_image"
tier = "standard"
backend_id = "sdxl"
pool = "gpu"
resource_cost = 8
min_duration_secs = 1
max_duration_secs = 4

[[profiles]]
capability = "create_image"
tier = "high"
backend_id = "sdxl-refiner"
pool = "gpu"
resource_cost = 16
min_duration_secs = 2
max_duration_secs = 8
"#;

fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("director.toml");
    std::fs::write(&path, content).unwrap();
    path
}

fn director(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_director"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn check_prints_summary() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), CONFIG);

    let out = director(&config, &["check"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("config ok: 1 pool(s), 3 profile(s)"));
}

#[test]
fn invalid_config_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "[monitor]\nrefresh_intervl_secs = 3\n");

    let out = director(&config, &["check"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
}

#[test]
fn route_reports_downgrade_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), CONFIG);

    let out = director(
        &config,
        &[
            "route",
            "--capability",
            "create_image",
            "--tier",
            "high",
            "--available",
            "gpu=10",
            "--json",
        ],
    );
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["accepted_tier"], "standard");
    assert_eq!(report["reason"], "insufficient_resources");
    assert_eq!(report["backend_id"], "sdxl");
}

#[test]
fn route_failure_exits_with_two() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), CONFIG);

    let out = director(
        &config,
        &[
            "route",
            "--capability",
            "create_image",
            "--tier",
            "low",
            "--available",
            "gpu=2",
        ],
    );
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("resources exhausted"));
}

#[test]
fn tiers_lists_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), CONFIG);

    let out = director(&config, &["tiers", "--capability", "create_image"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.lines().count(), 4);
    assert!(stdout.contains("sdxl-refiner"));
}

#[test]
fn serve_streams_job_events_until_stdin_closes() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), CONFIG);

    let mut child = Command::new(env!("CARGO_BIN_EXE_director"))
        .arg("--config")
        .arg(&config)
        .arg("serve")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, r#"{{"capability":"create_image","tier":"low","payload":{{}}}}"#).unwrap();
        writeln!(stdin, r#"{{"capability":"create_audio","tier":"low"}}"#).unwrap();
    }

    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let image: Vec<&str> = events
        .iter()
        .filter(|e| e["capability"] == "create_image")
        .filter_map(|e| e["kind"].as_str())
        .collect();
    assert_eq!(image.first(), Some(&"queued"));
    assert_eq!(image.last(), Some(&"succeeded"));

    let audio: Vec<&serde_json::Value> = events
        .iter()
        .filter(|e| e["capability"] == "create_audio")
        .collect();
    assert_eq!(audio.len(), 1);
    assert_eq!(audio[0]["kind"], "failed");
    assert_eq!(audio[0]["reason_code"], "unsupported");

    // Backend identifiers stay internal.
    assert!(!stdout.contains("sd-turbo"));
}

#[test]
fn serve_downgrades_while_earlier_jobs_hold_capacity() {
    let dir = tempfile::tempdir().unwrap();
    // High jobs run for two seconds, so the second request arrives while the
    // first one still holds 16 of the 24 units.
    let slow_high = CONFIG.replace(
        "min_duration_secs = 2\nmax_duration_secs = 8",
        "min_duration_secs = 20\nmax_duration_secs = 40",
    );
    assert_ne!(slow_high, CONFIG);
    let config = write_config(dir.path(), &slow_high);

    let mut child = Command::new(env!("CARGO_BIN_EXE_director"))
        .arg("--config")
        .arg(&config)
        .arg("serve")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, r#"{{"capability":"create_image","tier":"high"}}"#).unwrap();
        writeln!(stdin, r#"{{"capability":"create_image","tier":"high"}}"#).unwrap();
    }

    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let downgraded: Vec<&serde_json::Value> =
        events.iter().filter(|e| e["kind"] == "downgraded").collect();
    assert_eq!(downgraded.len(), 1);
    assert_eq!(downgraded[0]["reason_code"], "reduced_quality");
    assert_eq!(downgraded[0]["resolved_tier"], "standard");

    let succeeded = events.iter().filter(|e| e["kind"] == "succeeded").count();
    assert_eq!(succeeded, 2);
}
