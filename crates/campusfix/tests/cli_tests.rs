//! Integration tests for the `campusfix` binary
//!
//! Covers exit codes, JSON envelopes, and acting-user resolution.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn campusfix(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("campusfix").unwrap();
    cmd.current_dir(dir.path()).env_remove("CAMPUSFIX_USER");
    cmd
}

fn setup_test_env() -> TempDir {
    let dir = TempDir::new().unwrap();
    campusfix(&dir).arg("init").assert().success();
    dir
}

/// Register a user and return the printed ID
fn add_user(dir: &TempDir, name: &str, args: &[&str]) -> String {
    let output = campusfix(dir)
        .args(["user", "add", name])
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn create_issue(dir: &TempDir, as_user: &str) -> String {
    let output = campusfix(dir)
        .args(["--as", as_user, "issue", "create"])
        .args(["-t", "Fan not working", "-d", "Ceiling fan is dead"])
        .args(["-c", "Electrical", "-l", "Gargi", "-s", "Room 12"])
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

#[test]
fn test_init_creates_data_directory() {
    let dir = setup_test_env();
    assert!(dir.path().join(".campusfix").exists());
}

#[test]
fn test_missing_caller_is_unauthenticated() {
    let dir = setup_test_env();
    campusfix(&dir)
        .args(["issue", "list"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("authentication required"));
}

#[test]
fn test_create_and_list_json() {
    let dir = setup_test_env();
    let asha = add_user(&dir, "Asha", &["--hostel", "Gargi"]);
    let id = create_issue(&dir, &asha);

    let output = campusfix(&dir)
        .args(["--as", &asha, "--json", "issue", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["metadata"]["command"], "issue list");
    assert_eq!(value["data"][0]["id"], id.as_str());
    assert_eq!(value["data"][0]["owner_name"], "Asha");
    assert_eq!(value["data"][0]["status"], "pending");
}

#[test]
fn test_student_forbidden_status_exit_code() {
    let dir = setup_test_env();
    let asha = add_user(&dir, "Asha", &["--hostel", "Gargi"]);
    let id = create_issue(&dir, &asha);

    campusfix(&dir)
        .args(["--as", &asha, "issue", "status", &id, "defected"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Ask a staff member"));
}

#[test]
fn test_staff_resolves_by_short_id() {
    let dir = setup_test_env();
    let asha = add_user(&dir, "Asha", &["--hostel", "Gargi"]);
    let warden = add_user(&dir, "Warden", &["--role", "staff"]);
    let id = create_issue(&dir, &asha);

    campusfix(&dir)
        .args(["--as", &warden, "issue", "status", &id[..8], "resolved"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reporter trust +1.0"));

    let output = campusfix(&dir)
        .args(["--json", "user", "list"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let asha_row = value["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["full_name"] == "Asha")
        .unwrap()
        .clone();
    assert_eq!(asha_row["trust_score"], 1.0);
}

#[test]
fn test_unknown_issue_json_error() {
    let dir = setup_test_env();
    let asha = add_user(&dir, "Asha", &[]);

    let output = campusfix(&dir)
        .args(["--as", &asha, "--json", "issue", "delete", "deadbeef"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["success"], false);
    assert_eq!(value["error"]["code"], "not_found");
}

#[test]
fn test_uninitialized_storage_is_unavailable() {
    let dir = TempDir::new().unwrap();
    campusfix(&dir)
        .args(["mess", "analytics"])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("campusfix init"));
}

#[test]
fn test_invalid_status_rejected_by_parser() {
    let dir = setup_test_env();
    campusfix(&dir)
        .args(["--as", "x", "issue", "status", "abcd", "solved"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("valid:"));
}

#[test]
fn test_user_update_moves_student_to_new_hostel() {
    let dir = setup_test_env();
    let asha = add_user(&dir, "Asha", &["--hostel", "Gargi"]);
    let ravi = add_user(&dir, "Ravi", &["--hostel", "Kalpana"]);
    create_issue(&dir, &asha);

    let list_len = |user: &str| {
        let output = campusfix(&dir)
            .args(["--as", user, "--json", "issue", "list"])
            .output()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        value["data"].as_array().unwrap().len()
    };
    assert_eq!(list_len(&ravi), 0);

    campusfix(&dir)
        .args(["--as", &ravi, "user", "update", "--hostel", "Gargi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated Ravi (hostel: Gargi, room: -)"));

    assert_eq!(list_len(&ravi), 1);
}
