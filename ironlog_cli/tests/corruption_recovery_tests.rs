//! Corruption recovery tests for the ironlog binary.
//!
//! These tests verify the system can handle:
//! - A corrupted working session file
//! - Malformed import files
//! - Missing files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ironlog"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

#[test]
fn test_corrupted_session_can_be_cancelled() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    fs::create_dir_all(dir.join("data")).unwrap();
    fs::write(dir.join("data/current_session.json"), "{ invalid json }}}}").unwrap();

    cli(dir)
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unreadable"));

    cli(dir)
        .args(["add-set", "1", "100", "5"])
        .assert()
        .failure();

    // The broken file still counts as an open session
    cli(dir)
        .args(["start", "Any", "Block"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Conflict"));

    cli(dir).arg("cancel").assert().success();
    assert!(!dir.join("data/current_session.json").exists());
}

#[test]
fn test_malformed_program_file_rejected() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    let path = dir.join("program.toml");
    fs::write(&path, "name = \"P\"\n[[blocks]\nname = ").unwrap();

    cli(dir)
        .args(["program", "import"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Toml"));

    cli(dir)
        .args(["program", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No programs yet"));
}

#[test]
fn test_invalid_muscle_rejects_whole_import() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    let path = dir.join("exercises.toml");
    fs::write(
        &path,
        "[[exercise]]\nname = \"Row\"\nprimary_muscle = \"back\"\n\n[[exercise]]\nname = \"Neck Curl\"\nprimary_muscle = \"neck\"\n",
    )
    .unwrap();

    cli(dir)
        .args(["exercise", "import"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("neck"));

    cli(dir)
        .args(["exercise", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No exercises yet"));
}

#[test]
fn test_missing_import_file() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();

    cli(dir)
        .args(["exercise", "import"])
        .arg(dir.join("nope.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Io"));
}
