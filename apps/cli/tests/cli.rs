#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cifs_mount() -> Command {
    let mut cmd = Command::cargo_bin("cifs-mount").unwrap();
    cmd.env_remove("CIFS_MOUNT_CONFIG");
    cmd
}

#[test]
fn test_help_succeeds() {
    cifs_mount()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("unmount-all"))
        .stdout(predicate::str::contains("setup"));
}

#[test]
fn test_mount_without_share_is_usage_error() {
    cifs_mount()
        .arg("mount")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_unmount_without_target_is_usage_error() {
    cifs_mount()
        .arg("unmount")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_setup_without_shares_is_usage_error() {
    cifs_mount()
        .args(["setup", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_unknown_verb_is_usage_error() {
    cifs_mount()
        .arg("frobnicate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("frobnicate"));
}

#[test]
fn test_precondition_failure_exits_one() {
    // Fails on the privilege check as a normal user and on the config as root.
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "server = \n").unwrap();

    cifs_mount()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("error: "));
}
