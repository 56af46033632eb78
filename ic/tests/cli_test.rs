//! Command-line tests for the `ic` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `ic` isolated from the user's config and log directories
fn ic(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ic").expect("binary should build");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"));
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    ic(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("load-test"))
        .stdout(predicate::str::contains("simulate"))
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn test_sync_averages_readings() {
    let home = TempDir::new().unwrap();
    ic(&home)
        .args(["sync", "--server", "10:00:00", "--client", "a=10:00:20", "--client", "b=10:00:40"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Server time set to 10:00:00"))
        .stdout(predicate::str::contains("Registered time for a: 10:00:20"))
        .stdout(predicate::str::contains("10:00:20"));
}

#[test]
fn test_sync_rejects_bad_time() {
    let home = TempDir::new().unwrap();
    ic(&home)
        .args(["sync", "--server", "10:00:00", "--client", "a=25:00:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid time format"));
}

#[test]
fn test_load_test_json_export() {
    let home = TempDir::new().unwrap();
    let export = home.path().join("out").join("report.json");
    ic(&home)
        .args(["load-test", "-n", "3", "--format", "json", "--export"])
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"testStats\""));

    let content = std::fs::read_to_string(&export).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["results"].as_array().unwrap().len(), 3);
    assert!(home.path().join("data").join("intersect").join("logs").join("intersect.log").exists());
}

#[test]
fn test_load_test_rejects_out_of_range() {
    let home = TempDir::new().unwrap();
    ic(&home)
        .args(["load-test", "-n", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_request_unknown_signal() {
    let home = TempDir::new().unwrap();
    ic(&home)
        .args(["request", "T9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown signal: T9"));
}

#[test]
fn test_explicit_config_must_exist() {
    let home = TempDir::new().unwrap();
    ic(&home)
        .args(["--config", "missing.yml", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
