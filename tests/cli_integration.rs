//! Integration tests for the roadmap CLI

use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use roadmap_planner::Roadmap;
use tempfile::TempDir;

/// A roadmap command isolated to `dir`: its own data directory and settings
/// file, no Jira values leaking in from the environment.
fn roadmap(dir: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("roadmap"));
    cmd.arg("--data-dir")
        .arg(dir.path().join("data"))
        .arg("--settings")
        .arg(dir.path().join("settings.json"))
        .env("NO_COLOR", "1")
        .env_remove("JIRA_DOMAIN")
        .env_remove("JIRA_EMAIL")
        .env_remove("JIRA_API_TOKEN")
        .env_remove("JIRA_BOARD_ID")
        .env_remove("ROADMAP_DATA_DIR");
    cmd
}

fn init_q4(dir: &TempDir) {
    roadmap(dir)
        .args(["init", "-q", "4", "-y", "2025", "--member", "Ana", "--member", "Ben"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Roadmap for Q4 2025 with 13 weeks and 2 team members",
        ));
}

#[test]
fn test_version() {
    let temp = TempDir::new().unwrap();
    roadmap(&temp)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("roadmap-planner"));
}

#[test]
fn test_commands_need_a_roadmap() {
    let temp = TempDir::new().unwrap();
    roadmap(&temp)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("run `init` first"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let temp = TempDir::new().unwrap();
    init_q4(&temp);
    roadmap(&temp)
        .args(["init", "-q", "1", "-y", "2026"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_status_lists_members() {
    let temp = TempDir::new().unwrap();
    init_q4(&temp);
    roadmap(&temp)
        .args(["status", "--week", "W3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("W3"))
        .stdout(predicate::str::contains("Ana"))
        .stdout(predicate::str::contains("Ben"));
}

#[test]
fn test_assignment_survives_export_and_import() {
    let temp = TempDir::new().unwrap();
    init_q4(&temp);
    roadmap(&temp)
        .args(["task", "add", "Ledger", "--priority", "High"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added Ledger"));

    let task_id = Roadmap::open_dir(temp.path().join("data")).tasks.tasks()[0]
        .id
        .clone();
    roadmap(&temp)
        .args(["task", "assign", &task_id, "W2", "Ana"])
        .assert()
        .success();
    roadmap(&temp)
        .args(["task", "assign", &task_id, "W99", "Ana"])
        .assert()
        .failure();

    let export = temp.path().join("export.json");
    roadmap(&temp)
        .arg("export")
        .arg("--output")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 task(s)"));

    let other = TempDir::new().unwrap();
    roadmap(&other)
        .arg("import")
        .arg(&export)
        .assert()
        .success();
    roadmap(&other)
        .args(["task", "list", "--week", "W2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ledger"))
        .stdout(predicate::str::contains("Ana"));
}

#[test]
fn test_quarter_change_reports_pruned_assignments() {
    let temp = TempDir::new().unwrap();
    init_q4(&temp);
    roadmap(&temp).args(["task", "add", "Ledger"]).assert().success();
    let task_id = Roadmap::open_dir(temp.path().join("data")).tasks.tasks()[0]
        .id
        .clone();
    roadmap(&temp)
        .args(["task", "assign", &task_id, "W13", "Ben"])
        .assert()
        .success();

    roadmap(&temp)
        .args(["quarter", "1", "2019"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Q1 2019"))
        .stderr(predicate::str::contains("1 assignment(s)"));
}

#[test]
fn test_jira_requires_settings() {
    let temp = TempDir::new().unwrap();
    roadmap(&temp)
        .args(["jira", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing domain"));
}

#[test]
fn test_todo_lists() {
    let temp = TempDir::new().unwrap();
    roadmap(&temp).args(["todo", "list-add", "Inbox"]).assert().success();
    roadmap(&temp)
        .args(["todo", "add", "inbox", "call the vendor"])
        .assert()
        .success();
    roadmap(&temp)
        .args(["todo", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inbox"))
        .stdout(predicate::str::contains("call the vendor"));
}
