//! Concurrency tests for the ironlog binary.
//!
//! These tests verify that processes racing on the same data directory:
//! - Never open two sessions at once
//! - Never lose a set logged into the working session

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

const EXERCISES: &str = r#"
[[exercise]]
name = "Deadlift"
primary_muscle = "hamstrings"
"#;

const PROGRAM: &str = r#"
name = "Pull"

[[blocks]]
name = "Heavy"

[[blocks.exercises]]
name = "Deadlift"
sets = 6
"#;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ironlog"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn raw(dir: &Path, args: &[&str]) -> std::process::Output {
    let bin: PathBuf = assert_cmd::cargo::cargo_bin!("ironlog").to_path_buf();
    std::process::Command::new(bin)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .arg("--data-dir")
        .arg(dir.join("data"))
        .args(args)
        .output()
        .expect("Failed to run ironlog")
}

fn seed(dir: &Path) {
    fs::write(dir.join("exercises.toml"), EXERCISES).unwrap();
    fs::write(dir.join("program.toml"), PROGRAM).unwrap();
    cli(dir)
        .args(["exercise", "import"])
        .arg(dir.join("exercises.toml"))
        .assert()
        .success();
    cli(dir)
        .args(["program", "import"])
        .arg(dir.join("program.toml"))
        .assert()
        .success();
}

#[test]
fn test_racing_starts_open_one_session() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path().to_path_buf();
    seed(&dir);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dir = dir.clone();
            thread::spawn(move || raw(&dir, &["start", "Pull", "Heavy"]).status.success())
        })
        .collect();

    let succeeded = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(succeeded, 1, "exactly one start should win");
}

#[test]
fn test_racing_edits_fill_distinct_sets() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path().to_path_buf();
    seed(&dir);

    cli(&dir).args(["start", "Pull", "Heavy"]).assert().success();

    let handles: Vec<_> = (1..=6)
        .map(|i| {
            let dir = dir.clone();
            let weight = (100 + i * 10).to_string();
            thread::spawn(move || raw(&dir, &["edit-set", "1", weight.as_str(), "3"]).status.success())
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }

    let json = fs::read_to_string(dir.join("data/current_session.json")).unwrap();
    let state: serde_json::Value = serde_json::from_str(&json).unwrap();
    let mut weights: Vec<i64> = state["exercises"][0]["sets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["weight"].as_f64().unwrap() as i64)
        .collect();
    weights.sort();
    assert_eq!(weights, vec![110, 120, 130, 140, 150, 160]);
}
