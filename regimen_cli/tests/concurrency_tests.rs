//! Concurrency tests for the regimen binary.
//!
//! These tests verify that multiple processes can safely:
//! - Record sets into one workout simultaneously (file locking)
//! - Read while others write
//! - Finish the same workout more than once

use assert_cmd::Command;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("regimen"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn run(data_dir: &Path, args: &[&str]) -> String {
    let output = cli(data_dir).args(args).assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf8 stdout").trim().to_string()
}

fn show_json(data_dir: &Path, workout: &str) -> Value {
    serde_json::from_str(&run(data_dir, &["workout", "show", workout, "--json"])).expect("json")
}

#[test]
fn test_concurrent_set_logging() {
    let temp_dir = setup_test_dir();
    let data_dir: PathBuf = temp_dir.path().to_path_buf();

    let workout = run(&data_dir, &["workout", "start", "--ad-hoc"]);
    // Create the exercise up front so the writers only race on sets
    run(
        &data_dir,
        &["workout", "log-set", &workout, "--exercise", "Push-Up", "--block", "A", "--set", "1", "--reps", "10"],
    );

    let handles: Vec<_> = (2..=6)
        .map(|n| {
            let data_dir = data_dir.clone();
            let workout = workout.clone();
            thread::spawn(move || {
                cli(&data_dir)
                    .args([
                        "workout",
                        "log-set",
                        &workout,
                        "--exercise",
                        "Push-Up",
                        "--block",
                        "A",
                        "--set",
                        &n.to_string(),
                        "--reps",
                        "10",
                    ])
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    run(&data_dir, &["workout", "finish", &workout]);
    let json = show_json(&data_dir, &workout);
    let numbers: Vec<u64> = json["set_results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["set_number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(json["aggregates"]["total_reps"], 60);
}

#[test]
fn test_concurrent_reads_and_writes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();
    let program = run(&data_dir, &["program", "create", "Base", "--weeks", "6"]);

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let data_dir = data_dir.clone();
            let program = program.clone();
            thread::spawn(move || {
                cli(&data_dir)
                    .args(["session", "add", &program, &format!("Day {}", i)])
                    .assert()
                    .success();
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                cli(&data_dir).args(["program", "list"]).assert().success();
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().expect("Thread panicked");
    }

    let json = run(&data_dir, &["program", "show", &program, "--json"]);
    let program: Value = serde_json::from_str(&json).unwrap();
    let order: Vec<u64> = program["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["order_index"].as_u64().unwrap())
        .collect();
    assert_eq!(order, vec![1, 2, 3, 4]);
}

#[test]
fn test_repeated_finish_is_stable() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let workout = run(&data_dir, &["workout", "start", "--ad-hoc"]);
    for n in 1..=3 {
        run(
            &data_dir,
            &[
                "workout", "log-set", &workout, "--exercise", "Deadlift", "--block", "A", "--set",
                &n.to_string(), "--reps", "5", "--weight", "140",
            ],
        );
    }

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let data_dir = data_dir.clone();
            let workout = workout.clone();
            thread::spawn(move || {
                cli(&data_dir).args(["workout", "finish", &workout]).assert().success();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let first = show_json(&data_dir, &workout);
    run(&data_dir, &["workout", "finish", &workout]);
    let second = show_json(&data_dir, &workout);
    assert_eq!(first["ended_at"], second["ended_at"]);
    assert_eq!(first["aggregates"], second["aggregates"]);
    assert_eq!(second["aggregates"]["total_volume_load"], 2100.0);
}
