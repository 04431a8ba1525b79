use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("anisync")
        .env("ANISYNC_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    cargo_bin_cmd!("anisync")
        .env("ANISYNC_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("server_url ="));
    assert!(contents.contains("# poll_interval_ms = 1000"));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "# existing config").unwrap();

    cargo_bin_cmd!("anisync")
        .env("ANISYNC_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_set_server_saves_url() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("anisync")
        .env("ANISYNC_HOME", dir.path())
        .args(["config", "set-server", "http://nas.local:5000"])
        .assert()
        .success();

    let contents = fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(contents.contains("server_url = \"http://nas.local:5000\""));
}

#[test]
fn test_config_set_server_rejects_invalid_url() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("anisync")
        .env("ANISYNC_HOME", dir.path())
        .args(["config", "set-server", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid server URL"));

    assert!(!dir.path().join("config.toml").exists());
}
