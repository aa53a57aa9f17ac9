//! Integration tests for the `rainfly` CLI binary.
//!
//! These tests validate argument parsing, help output, shell
//! completions, and error handling — all without a live backend.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `rainfly` binary with env isolation.
///
/// Clears all `RAINFLY_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn rainfly_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("rainfly");
    cmd.env("HOME", "/tmp/rainfly-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/rainfly-cli-test-nonexistent")
        .env_remove("RAINFLY_PROFILE")
        .env_remove("RAINFLY_BASE_URL")
        .env_remove("RAINFLY_TOKEN");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = rainfly_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    rainfly_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("smart-home")
            .and(predicate::str::contains("nodes"))
            .and(predicate::str::contains("schedules"))
            .and(predicate::str::contains("scenes"))
            .and(predicate::str::contains("claim")),
    );
}

#[test]
fn test_version_flag() {
    rainfly_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rainfly"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    rainfly_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    rainfly_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = rainfly_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_nodes_list_without_config() {
    rainfly_cmd()
        .args(["nodes", "list"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("config")
                .or(predicate::str::contains("Configuration"))
                .or(predicate::str::contains("base-url")),
        );
}

#[test]
fn test_schedule_save_requires_selection() {
    let output = rainfly_cmd()
        .args(["schedules", "save", "--name", "x", "--time", "07:30"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("--set") || text.contains("required"),
        "Expected missing --set error:\n{text}"
    );
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_schedules_subcommands_exist() {
    rainfly_cmd()
        .args(["schedules", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("save"))
                .and(predicate::str::contains("enable"))
                .and(predicate::str::contains("disable"))
                .and(predicate::str::contains("delete")),
        );
}

#[test]
fn test_scenes_subcommands_exist() {
    rainfly_cmd()
        .args(["scenes", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("save"))
                .and(predicate::str::contains("activate"))
                .and(predicate::str::contains("delete")),
        );
}

#[test]
fn test_sharing_subcommands_exist() {
    rainfly_cmd()
        .args(["sharing", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("add")
                .and(predicate::str::contains("requests"))
                .and(predicate::str::contains("respond"))
                .and(predicate::str::contains("revoke")),
        );
}
