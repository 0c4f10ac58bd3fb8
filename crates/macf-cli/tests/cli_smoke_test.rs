//! End-to-end smoke tests driving the `macf` binary through `assert_cmd`,
//! in the style of the example CLI's integration test fixtures.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn macf(root: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("macf").expect("binary builds");
    cmd.arg("--project-root").arg(root);
    cmd
}

#[test]
fn agent_init_scaffolds_the_workspace() {
    let dir = TempDir::new().unwrap();
    macf(dir.path()).arg("agent").arg("init").assert().success();

    assert!(dir.path().join(".macf").is_dir());
    assert!(dir.path().join(".macf").join("policy").join("base").is_dir());
}

#[test]
fn env_reports_the_resolved_project_root() {
    let dir = TempDir::new().unwrap();
    macf(dir.path())
        .arg("--format")
        .arg("json")
        .arg("env")
        .assert()
        .success()
        .stdout(predicate::str::contains("project_root"));
}

#[test]
fn time_prints_an_rfc3339_timestamp() {
    let dir = TempDir::new().unwrap();
    macf(dir.path())
        .arg("time")
        .assert()
        .success()
        .stdout(predicate::str::contains("T"));
}

#[test]
fn mode_defaults_to_manual_with_no_events() {
    let dir = TempDir::new().unwrap();
    macf(dir.path()).arg("agent").arg("init").assert().success();

    macf(dir.path())
        .arg("mode")
        .arg("get")
        .assert()
        .success()
        .stdout(predicate::str::contains("MANUAL_MODE"));
}

#[test]
fn events_stats_on_an_empty_log_reports_zero_types() {
    let dir = TempDir::new().unwrap();
    macf(dir.path()).arg("agent").arg("init").assert().success();

    macf(dir.path())
        .arg("--format")
        .arg("json")
        .arg("events")
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("unique_event_types"));
}

#[test]
fn config_init_then_show_round_trips_the_manifest() {
    let dir = TempDir::new().unwrap();
    macf(dir.path()).arg("config").arg("init").assert().success();

    macf(dir.path())
        .arg("config")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("active_layers"));
}

#[test]
fn policy_ca_types_lists_the_known_task_types() {
    let dir = TempDir::new().unwrap();
    macf(dir.path())
        .arg("policy")
        .arg("ca-types")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mission"));
}
