//! End-to-end tests of the interop-runner binary with a stand-in docker CLI
#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const REGISTRY: &str = r#"{
    "current_target": "draft-14",
    "implementations": {
        "moq-rs": {
            "name": "moq-rs",
            "draft_versions": ["draft-13", "draft-14"],
            "roles": {
                "client": { "docker": { "image": "moq-rs-client" } },
                "relay": {
                    "docker": { "image": "moq-rs-relay" },
                    "remote": [
                        { "url": "https://relay.example", "transport": "webtransport" },
                        { "url": "moqt://relay.example", "transport": "quic", "status": "inactive" }
                    ]
                }
            }
        },
        "legacy": {
            "name": "legacy",
            "draft_versions": ["draft-07"],
            "roles": { "client": { "docker": { "image": "legacy-client" } } }
        }
    }
}"#;

/// A project directory with a registry and a fake docker exiting with `exit_code`.
fn project(exit_code: i32) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("implementations.json"), REGISTRY).unwrap();

    let docker = dir.path().join("fake-docker");
    fs::write(&docker, format!("#!/bin/sh\necho \"fake docker $*\"\nexit {exit_code}\n")).unwrap();
    fs::set_permissions(&docker, fs::Permissions::from_mode(0o755)).unwrap();

    let settings = serde_json::json!({
        "docker_program": docker.display().to_string(),
        "timeout_secs": 20,
    });
    fs::write(dir.path().join(".interop-runner.json"), settings.to_string()).unwrap();
    dir
}

/// Like `project`, but `up` and `run` hang until killed; every call is logged.
fn hanging_project() -> TempDir {
    let dir = project(0);
    let docker = dir.path().join("fake-docker");
    let calls = dir.path().join("docker-calls.log");
    let script = format!(
        "#!/bin/sh\necho \"$*\" >> '{}'\ncase \"$*\" in\n  \"run \"*|*\" up \"*) exec sleep 30 ;;\nesac\nexit 0\n",
        calls.display()
    );
    fs::write(&docker, script).unwrap();
    fs::set_permissions(&docker, fs::Permissions::from_mode(0o755)).unwrap();
    dir
}

fn runner(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("interop-runner").unwrap();
    cmd.current_dir(dir);
    cmd
}

fn only_ledger(results: &Path) -> PathBuf {
    let invocations: Vec<PathBuf> = fs::read_dir(results)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(invocations.len(), 1, "expected one invocation directory");
    invocations[0].join("summary.json")
}

#[test]
fn test_list_prints_plan_without_running() {
    let dir = project(0);
    runner(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("moq-rs -> moq-rs @ draft-14"))
        .stdout(predicate::str::contains("remote https://relay.example (webtransport)"))
        .stdout(predicate::str::contains("skip legacy -> moq-rs"))
        .stdout(predicate::str::contains("moqt://relay.example").not());
    assert!(!dir.path().join("results").exists());
}

#[test]
fn test_run_records_passing_runs() {
    let dir = project(0);
    runner(dir.path())
        .arg("run")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Total: 2  Passed: 2  Failed: 0"))
        .stdout(predicate::str::contains("legacy -> moq-rs"));

    let ledger = only_ledger(&dir.path().join("results"));
    let document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&ledger).unwrap()).unwrap();
    assert_eq!(document["target_version"], "draft-14");
    assert_eq!(document["runs"].as_array().unwrap().len(), 2);

    let transcript = ledger.with_file_name("moq-rs_to_moq-rs_docker.log");
    assert!(fs::read_to_string(transcript).unwrap().contains("fake docker compose"));
}

#[test]
fn test_failures_set_exit_status() {
    let dir = project(3);
    runner(dir.path())
        .args(["run", "--remote-only"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Total: 1  Passed: 0  Failed: 1"))
        .stdout(predicate::str::contains("exit=3"));
}

#[test]
fn test_conflicting_modes_abort_before_running() {
    let dir = project(0);
    runner(dir.path())
        .args(["run", "--docker-only", "--remote-only"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("mutually exclusive"));
    assert!(!dir.path().join("results").exists());
}

#[test]
fn test_unknown_relay_is_rejected() {
    let dir = project(0);
    runner(dir.path())
        .args(["list", "--relay", "nope"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown relay 'nope'"));
}

#[test]
fn test_summary_matches_recorded_run() {
    let dir = project(0);
    runner(dir.path())
        .args(["run", "--docker-only", "--results-dir", "out"])
        .assert()
        .code(0);

    let ledger = only_ledger(&dir.path().join("out"));
    runner(dir.path())
        .arg("summary")
        .arg(&ledger)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Total: 1  Passed: 1  Failed: 0"));
}

#[test]
fn test_timed_out_runs_release_their_containers() {
    let dir = hanging_project();
    runner(dir.path())
        .args(["run", "--timeout", "1"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Total: 2  Passed: 0  Failed: 2"))
        .stdout(predicate::str::contains("exit=124"));

    let calls = fs::read_to_string(dir.path().join("docker-calls.log")).unwrap();
    assert!(calls.contains("-p interop-moq-rs-moq-rs up"), "{calls}");
    assert!(calls.contains("-p interop-moq-rs-moq-rs down --remove-orphans"), "{calls}");
    assert!(calls.contains("run --rm --name interop-moq-rs-moq-rs-remote-0"), "{calls}");
    assert!(calls.contains("rm -f interop-moq-rs-moq-rs-remote-0"), "{calls}");
}
