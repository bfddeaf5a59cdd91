//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (code, stdout, stderr).
fn run_cli(dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_moodlog"))
        .args(args)
        .env("MOODLOG_DATA_DIR", dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let (code, stdout, stderr) = run_cli(dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_moods_include_sentinel() {
    let dir = TempDir::new().unwrap();
    let moods = run_json(dir.path(), &["moods"]);
    let names: Vec<&str> = moods
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.first(), Some(&"Excited"));
    assert_eq!(names.last(), Some(&"Asleep"));
}

#[test]
fn test_track_start_and_stop() {
    let dir = TempDir::new().unwrap();
    let work = run_json(dir.path(), &["track", "start"]);
    assert_eq!(work["name"], "mood-check");

    let status = run_json(dir.path(), &["track", "status"]);
    assert_eq!(status["tracking"], true);
    assert_eq!(status["drift"], "consistent");
    assert_eq!(status["queued"]["id"], work["id"]);

    let (code, stdout, _) = run_cli(dir.path(), &["track", "stop"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("tracking stopped"));

    let status = run_json(dir.path(), &["track", "status"]);
    assert_eq!(status["tracking"], false);
    assert!(status["queued"].is_null());
}

#[test]
fn test_fire_while_stopped_is_skipped() {
    let dir = TempDir::new().unwrap();
    let report = run_json(dir.path(), &["fire"]);
    assert_eq!(report["type"], "skipped");
}

#[test]
fn test_record_and_export() {
    let dir = TempDir::new().unwrap();
    let entry = run_json(dir.path(), &["record", "happy", "--hour", "2026101814"]);
    assert_eq!(entry["mood"], "Happy");
    assert_eq!(entry["bucket"], 2026101814);

    let (code, _, stderr) = run_cli(dir.path(), &["record", "Ecstatic"]);
    assert_ne!(code, 0);
    assert!(stderr.starts_with("error:"));

    let out = dir.path().join("export.csv");
    let (code, _, _) = run_cli(dir.path(), &["data", "export", out.to_str().unwrap()]);
    assert_eq!(code, 0);
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("hour,timestamp,mood\n"));
    assert!(text.contains("2026101814,"));
    assert!(text.trim_end().ends_with(",Happy"));
}

#[test]
fn test_config_set_validates() {
    let dir = TempDir::new().unwrap();
    let (code, _, _) = run_cli(
        dir.path(),
        &["config", "set", "scheduling.min_interval_minutes", "45"],
    );
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "scheduling.min_interval_minutes"]);
    assert_eq!(stdout.trim(), "45");

    // min above max is rejected and nothing is saved.
    let (code, _, _) = run_cli(
        dir.path(),
        &["config", "set", "scheduling.min_interval_minutes", "120"],
    );
    assert_ne!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "scheduling.min_interval_minutes"]);
    assert_eq!(stdout.trim(), "45");
}

#[test]
fn test_data_reset_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    run_json(dir.path(), &["record", "Sad", "--hour", "2026101809"]);

    let (code, _, _) = run_cli(dir.path(), &["data", "reset"]);
    assert_ne!(code, 0);

    let (code, _, _) = run_cli(dir.path(), &["data", "reset", "--yes"]);
    assert_eq!(code, 0);
    let status = run_json(dir.path(), &["track", "status"]);
    assert_eq!(status["total_entries"], 0);
}

#[test]
fn test_oversized_day_count_is_an_error() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["entries", "timeline", "--days", "200000000"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));
}
