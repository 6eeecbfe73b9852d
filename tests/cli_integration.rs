//! Integration tests for the rejoin CLI

use assert_cmd::cargo;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const WEBHOOK: &str = "https://discord.com/api/webhooks/123456789/abc-DEF_123";

/// Get a Command for the rejoin binary
fn rejoin() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("rejoin"));
    cmd.env_remove("REJOIN_CONFIG");
    cmd
}

fn settings_file(temp: &TempDir) -> PathBuf {
    temp.path().join("settings.json")
}

#[test]
fn test_help() {
    rejoin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Keeps game clients alive"));
}

#[test]
fn test_version() {
    rejoin()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_config_show_defaults_without_file() {
    let temp = TempDir::new().unwrap();

    rejoin()
        .arg("--config")
        .arg(settings_file(&temp))
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Interval: 28 minute(s)"))
        .stdout(predicate::str::contains("Click point: not set"));

    assert!(!settings_file(&temp).exists());
}

#[test]
fn test_config_set_then_show_json() {
    let temp = TempDir::new().unwrap();
    let path = settings_file(&temp);

    rejoin()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "--interval", "15", "--webhook", WEBHOOK])
        .args(["--click-x", "640", "--click-y", "-20", "--limit-helpers", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Settings saved"));

    let output = rejoin()
        .arg("--config")
        .arg(&path)
        .args(["config", "show", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["intervalMinutes"], 15);
    assert_eq!(json["webhookUrls"][0], WEBHOOK);
    assert_eq!(json["clickX"], 640);
    assert_eq!(json["clickY"], -20);
    assert_eq!(json["limitHelpers"], true);
}

#[test]
fn test_config_validate_rejects_missing_webhook() {
    let temp = TempDir::new().unwrap();

    rejoin()
        .arg("--config")
        .arg(settings_file(&temp))
        .args(["config", "validate"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("webhookUrls"));
}

#[test]
fn test_config_validate_accepts_complete_settings() {
    let temp = TempDir::new().unwrap();
    let path = settings_file(&temp);

    rejoin()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "--webhook", WEBHOOK])
        .assert()
        .success();

    rejoin()
        .arg("--config")
        .arg(&path)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_set_rejects_interval_out_of_range() {
    let temp = TempDir::new().unwrap();

    for interval in ["0", "1000"] {
        rejoin()
            .arg("--config")
            .arg(settings_file(&temp))
            .args(["config", "set", "--interval", interval])
            .assert()
            .failure()
            .code(2);
    }
    assert!(!settings_file(&temp).exists());
}

#[test]
fn test_config_set_requires_both_coordinates() {
    let temp = TempDir::new().unwrap();

    rejoin()
        .arg("--config")
        .arg(settings_file(&temp))
        .args(["config", "set", "--click-x", "10"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_corrupt_settings_fall_back_to_defaults() {
    let temp = TempDir::new().unwrap();
    let path = settings_file(&temp);
    std::fs::write(&path, "{ not json").unwrap();

    rejoin()
        .arg("--config")
        .arg(&path)
        .args(["config", "show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"intervalMinutes\": 28"));
}

#[test]
fn test_config_reset() {
    let temp = TempDir::new().unwrap();
    let path = settings_file(&temp);

    rejoin()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "--interval", "5"])
        .assert()
        .success();

    rejoin()
        .arg("--config")
        .arg(&path)
        .args(["config", "reset"])
        .assert()
        .success();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"intervalMinutes\": 28"));
}

#[test]
fn test_config_paths() {
    let temp = TempDir::new().unwrap();

    rejoin()
        .arg("--config")
        .arg(settings_file(&temp))
        .args(["config", "paths"])
        .assert()
        .success()
        .stdout(predicate::str::contains("settings.json"))
        .stdout(predicate::str::contains("defaults in use"));
}

#[test]
fn test_run_refuses_invalid_settings() {
    let temp = TempDir::new().unwrap();

    rejoin()
        .arg("--config")
        .arg(settings_file(&temp))
        .arg("run")
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Configuration is invalid"));
}

#[test]
fn test_notify_test_without_webhooks() {
    let temp = TempDir::new().unwrap();

    rejoin()
        .arg("--config")
        .arg(settings_file(&temp))
        .arg("notify-test")
        .assert()
        .code(7)
        .stderr(predicate::str::contains("no webhooks configured"));
}
