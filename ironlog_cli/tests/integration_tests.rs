//! Integration tests for the ironlog binary.
//!
//! These tests verify end-to-end behavior including:
//! - Catalog and program import
//! - The session workflow from start to end
//! - History listing and CSV export

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const EXERCISES: &str = r#"
[[exercise]]
name = "Squat"
primary_muscle = "quads"

[[exercise]]
name = "Front Squat"
primary_muscle = "quads"

[[exercise]]
name = "Pull-up"
primary_muscle = "back"
"#;

const PROGRAM: &str = r#"
name = "Strength"

[[blocks]]
name = "Lower"

[[blocks.exercises]]
name = "Squat"
sets = 3
reps = ["5", "5", "AMRAP"]
target_rm_percent = [75.0, 80.0, 85.0]
program_1rm = 140.0
options = ["Front Squat"]

[[blocks.exercises]]
name = "Pull-up"
sets = 2
reps = ["8"]
"#;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the CLI binary, isolated from any user config
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ironlog"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

/// Import the catalog and program used by most tests
fn seed(dir: &Path) {
    let exercises = dir.join("exercises.toml");
    let program = dir.join("program.toml");
    fs::write(&exercises, EXERCISES).unwrap();
    fs::write(&program, PROGRAM).unwrap();

    cli(dir)
        .args(["exercise", "import"])
        .arg(&exercises)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 3 exercises"));

    cli(dir)
        .args(["program", "import"])
        .arg(&program)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created program Strength"));
}

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Strength training log"));
}

#[test]
fn test_full_session_workflow() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    cli(dir)
        .args(["start", "strength", "lower"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session started"))
        .stdout(predicate::str::contains("1. Squat"))
        .stdout(predicate::str::contains("2. Pull-up"));

    assert!(dir.join("data/current_session.json").exists());

    cli(dir)
        .args(["edit-set", "1", "100", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Squat set 1: 100x5"));

    cli(dir)
        .args(["edit-set", "2", "0", "8", "--bodyweight"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BWx8"));

    cli(dir)
        .args(["add-set", "1", "90", "8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("90x8"));

    cli(dir)
        .args(["note", "1", "felt", "strong"])
        .assert()
        .success();

    cli(dir)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("100x5"))
        .stdout(predicate::str::contains("Note: felt strong"))
        .stdout(predicate::str::contains("(2/4 sets)"));

    cli(dir)
        .arg("end")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session saved"))
        .stdout(predicate::str::contains("Squat: 100x5, 90x8"));

    assert!(!dir.join("data/current_session.json").exists());

    cli(dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("Strength / Lower"))
        .stdout(predicate::str::contains("2 exercises, 6 sets"));

    cli(dir)
        .args(["exercise", "show", "squat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Estimated 1RM: 116.7"));
}

#[test]
fn test_previous_session_shown_on_next_start() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    cli(dir).args(["start", "Strength", "Lower"]).assert().success();
    cli(dir).args(["edit-set", "1", "102.5", "5"]).assert().success();
    cli(dir).arg("end").assert().success();

    cli(dir)
        .args(["start", "Strength", "Lower"])
        .assert()
        .success()
        .stdout(predicate::str::contains("last 102.5x5"));
}

#[test]
fn test_second_start_conflicts() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    cli(dir).args(["start", "Strength", "Lower"]).assert().success();
    cli(dir)
        .args(["start", "Strength", "Lower"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Conflict"));
}

#[test]
fn test_commands_need_an_active_session() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    for args in [vec!["show"], vec!["end"], vec!["cancel"], vec!["add-set", "1", "50", "5"]] {
        cli(dir)
            .args(&args)
            .assert()
            .failure()
            .stderr(predicate::str::contains("no active session"));
    }
}

#[test]
fn test_swap_to_unknown_variation_is_rejected() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    cli(dir).args(["start", "Strength", "Lower"]).assert().success();
    let before = fs::read_to_string(dir.join("data/current_session.json")).unwrap();

    cli(dir)
        .args(["swap", "1", "Leg Press"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation"));

    let after = fs::read_to_string(dir.join("data/current_session.json")).unwrap();
    assert_eq!(before, after);

    cli(dir)
        .args(["swap", "1", "front squat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exercise 1 is now Front Squat"));
}

#[test]
fn test_cancel_discards_session() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    cli(dir).args(["start", "Strength", "Lower"]).assert().success();
    cli(dir).args(["edit-set", "1", "100", "5"]).assert().success();
    cli(dir)
        .arg("cancel")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session discarded"));

    cli(dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions logged yet"));
}

#[test]
fn test_program_reimport_updates_in_place() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    cli(dir)
        .args(["program", "import"])
        .arg(dir.join("program.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated program Strength"))
        .stdout(predicate::str::contains("Blocks: 0 added, 1 updated"))
        .stdout(predicate::str::contains("Exercises: 0 added, 2 updated"));

    cli(dir)
        .args(["program", "show", "STRENGTH"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Squat 3x5/5/AMRAP"));
}

#[test]
fn test_program_with_unknown_exercise_fails() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    let broken = dir.join("broken.toml");
    fs::write(
        &broken,
        "name = \"Broken\"\n[[blocks]]\nname = \"A\"\n[[blocks.exercises]]\nname = \"Zercher Squat\"\nsets = 3\n",
    )
    .unwrap();

    cli(dir)
        .args(["program", "import"])
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Zercher Squat"));

    cli(dir)
        .args(["program", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Broken").not());
}

#[test]
fn test_exercise_add_and_duplicate() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["exercise", "add", "Dip", "--muscle", "triceps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added Dip (triceps)"));

    cli(dir)
        .args(["exercise", "add", "dip", "--muscle", "chest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cli(dir)
        .args(["exercise", "show", "Dip"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Estimated 1RM: -"))
        .stdout(predicate::str::contains("Last performed: never"));
}

#[test]
fn test_export_csv() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    cli(dir).args(["start", "Strength", "Lower"]).assert().success();
    cli(dir).args(["edit-set", "1", "100", "5"]).assert().success();
    cli(dir).arg("end").assert().success();

    let csv_path = dir.join("export/sets.csv");
    cli(dir)
        .arg("export")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 5 sets"));

    let contents = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(contents.lines().count(), 6);
    assert!(contents.contains("Strength,Lower,,"));
    assert!(contents.contains(",Squat,1,100.0,5,false,false,"));
}

#[test]
fn test_status_after_a_session() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    cli(dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sessions:         0"))
        .stdout(predicate::str::contains("none yet"));

    cli(dir).args(["start", "Strength", "Lower"]).assert().success();
    cli(dir).args(["edit-set", "1", "100", "5"]).assert().success();
    cli(dir).args(["edit-set", "1", "100", "5"]).assert().success();
    cli(dir).arg("end").assert().success();

    cli(dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total volume:     1000"))
        .stdout(predicate::str::contains("Sessions:         1"))
        .stdout(predicate::str::contains("Week streak:      1 week"))
        .stdout(predicate::str::contains("quads        2"));
}

#[test]
fn test_program_delete() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    cli(dir).args(["start", "Strength", "Lower"]).assert().success();
    cli(dir)
        .args(["program", "delete", "Strength"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("session in progress"));
    cli(dir).arg("cancel").assert().success();

    cli(dir)
        .args(["program", "delete", "strength"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted program Strength (1 blocks)"));

    cli(dir)
        .args(["program", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No programs yet"));

    cli(dir)
        .args(["program", "delete", "Strength"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));
}

#[test]
fn test_program_with_history_cannot_be_deleted() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    cli(dir).args(["start", "Strength", "Lower"]).assert().success();
    cli(dir).arg("end").assert().success();

    cli(dir)
        .args(["program", "delete", "Strength"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 logged sessions"));

    cli(dir)
        .args(["program", "show", "Strength"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lower"));
}

#[test]
fn test_nan_weight_leaves_session_readable() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    seed(dir);

    cli(dir).args(["start", "Strength", "Lower"]).assert().success();
    let before = fs::read_to_string(dir.join("data/current_session.json")).unwrap();

    for weight in ["nan", "inf"] {
        cli(dir)
            .args(["edit-set", "1", weight, "5"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Validation"));
    }

    let after = fs::read_to_string(dir.join("data/current_session.json")).unwrap();
    assert_eq!(before, after);
    cli(dir).arg("show").assert().success();
}
