//! Corruption handling tests for the regimen binary.
//!
//! These tests verify the system:
//! - Refuses to run over a corrupted data file instead of replacing it
//! - Starts cleanly when the data file is missing
//! - Ignores leftover temp files from interrupted writes

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
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

#[test]
fn test_corrupted_data_file_is_not_clobbered() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let db_path = data_dir.join("regimen.json");
    fs::write(&db_path, "{ invalid json }}}}").expect("Failed to write corrupted data");

    cli(data_dir)
        .args(["program", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Json"));

    cli(data_dir)
        .args(["program", "create", "Should Not Land", "--weeks", "2"])
        .assert()
        .failure();

    let content = fs::read_to_string(&db_path).unwrap();
    assert_eq!(content, "{ invalid json }}}}");
}

#[test]
fn test_missing_data_file_starts_empty() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("fresh");

    cli(&data_dir)
        .args(["program", "list"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(data_dir.exists());
}

#[test]
fn test_stray_temp_files_are_ignored() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["program", "create", "Kept", "--weeks", "3"])
        .assert()
        .success();

    // Simulate a write interrupted before persist
    fs::write(data_dir.join(".tmpXYZ123"), "{\"partial\":").unwrap();

    cli(data_dir)
        .args(["program", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Kept"));
}

#[test]
fn test_truncated_data_file_reports_error() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["program", "create", "Original", "--weeks", "3"])
        .assert()
        .success();

    let db_path = data_dir.join("regimen.json");
    let content = fs::read_to_string(&db_path).unwrap();
    fs::write(&db_path, &content[..content.len() / 2]).unwrap();

    cli(data_dir)
        .args(["program", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Json"));
}
