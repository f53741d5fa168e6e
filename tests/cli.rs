// ABOUTME: Integration tests for the dokimi CLI commands.
// ABOUTME: Validates --help output, init behavior, and config discovery failures.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn dokimi_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("dokimi"))
}

#[test]
fn help_shows_phase_commands() {
    dokimi_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("converge"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("login"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("dokimi.yml");

    dokimi_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--host", "box-9.test"])
        .assert()
        .success();

    assert!(config_path.exists(), "dokimi.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("hostname: box-9.test"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("dokimi.yml");

    fs::write(&config_path, "sudo: false").unwrap();

    dokimi_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn phases_fail_without_config() {
    let temp_dir = tempfile::tempdir().unwrap();

    dokimi_cmd()
        .current_dir(temp_dir.path())
        .arg("converge")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn status_fails_without_instance_section() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("dokimi.yml"), "sudo: false").unwrap();

    dokimi_cmd()
        .current_dir(temp_dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no instance configured"));
}
