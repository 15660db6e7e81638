//! Integration tests for the regimen binary.
//!
//! These tests verify end-to-end behavior including:
//! - Planning a program down to block items
//! - Recording and finishing a workout
//! - Analytics, methodology reports and CSV export
//! - Error exits for missing entities and invalid state

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI bound to a data directory, with config isolated from the host
fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("regimen"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

/// Run a command that must succeed and return its trimmed stdout
fn run(data_dir: &Path, args: &[&str]) -> String {
    let output = cli(data_dir).args(args).assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf8 stdout").trim().to_string()
}

struct Plan {
    program: String,
    session: String,
    block_a: String,
    block_b: String,
    squat_item: String,
}

fn build_plan(data_dir: &Path) -> Plan {
    let program = run(data_dir, &["program", "create", "Hybrid Strength", "--weeks", "4"]);
    let session = run(data_dir, &["session", "add", &program, "Day 1"]);
    let block_a = run(data_dir, &["block", "add", &session, "A"]);
    let squat_item = run(
        data_dir,
        &[
            "item", "add", &block_a, "--exercise", "Back Squat", "--sets", "3", "--reps", "5",
            "--weight", "100",
        ],
    );
    let block_b = run(
        data_dir,
        &[
            "block", "add", &session, "B", "--type", "emom", "--interval-seconds", "60",
            "--duration-seconds", "600",
        ],
    );
    run(
        data_dir,
        &[
            "item", "add", &block_b, "--exercise", "Burpee", "--set-type", "emom", "--reps", "10",
            "--emom-minutes", "10",
        ],
    );
    Plan {
        program,
        session,
        block_a,
        block_b,
        squat_item,
    }
}

/// Start, log three squat sets and the EMOM block, then finish
fn record_workout(data_dir: &Path, plan: &Plan) -> String {
    let workout = run(data_dir, &["workout", "start", "--session", &plan.session]);
    for n in 1..=3 {
        run(
            data_dir,
            &[
                "workout", "log-set", &workout, "--item", &plan.squat_item, "--set", &n.to_string(),
                "--reps", "5", "--weight", "100", "--rpe", "8",
            ],
        );
    }
    run(
        data_dir,
        &["workout", "log-block", &workout, "--block", &plan.block_b, "--completed", "10"],
    );
    cli(data_dir)
        .args(["workout", "finish", &workout])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session finished"));
    workout
}

fn show_json(data_dir: &Path, workout: &str) -> Value {
    let out = run(data_dir, &["workout", "show", workout, "--json"]);
    serde_json::from_str(&out).expect("workout json")
}

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Structured training planner and workout log",
        ));
}

#[test]
fn test_plan_is_persisted_and_shown() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let plan = build_plan(data_dir);

    assert!(data_dir.join("regimen.json").exists());

    cli(data_dir)
        .args(["program", "show", &plan.program])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hybrid Strength"))
        .stdout(predicate::str::contains("Back Squat"))
        .stdout(predicate::str::contains("EMOM"));

    // Named exercises were created once each
    cli(data_dir)
        .args(["exercise", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Back Squat"))
        .stdout(predicate::str::contains("Burpee"));

    let json = run(data_dir, &["program", "show", &plan.program, "--json"]);
    let program: Value = serde_json::from_str(&json).unwrap();
    let blocks = program["sessions"][0]["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0]["id"], plan.block_a.as_str());
    assert_eq!(blocks[1]["order_index"], 2);
}

#[test]
fn test_program_start_derives_end_date() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let program = run(data_dir, &["program", "create", "Block", "--weeks", "4"]);

    cli(data_dir)
        .args(["program", "start", &program, "--date", "2024-03-04"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03-04 → 2024-04-01"));
}

#[test]
fn test_full_workout_cycle() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let plan = build_plan(data_dir);
    let workout = record_workout(data_dir, &plan);

    let json = show_json(data_dir, &workout);
    assert_eq!(json["aggregates"]["total_reps"], 15);
    assert_eq!(json["aggregates"]["total_volume_load"], 1500.0);
    assert_eq!(json["aggregates"]["average_rpe"], 8.0);
    assert!(json["ended_at"].is_string());

    let block = &json["block_results"][0];
    assert_eq!(block["block_label"], "B");
    assert_eq!(block["completion"]["completion_percentage"], 100.0);
    assert_eq!(block["completion"]["completed_as_planned"], true);

    let sets = json["set_results"].as_array().unwrap();
    assert_eq!(sets.len(), 3);
    assert_eq!(sets[0]["result_type"], "straight_set");
    assert_eq!(sets[0]["target_reps"], 5);

    cli(data_dir)
        .args(["workout", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(workout.as_str()))
        .stdout(predicate::str::contains("finished"));
}

#[test]
fn test_finished_workout_rejects_new_sets() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let plan = build_plan(data_dir);
    let workout = record_workout(data_dir, &plan);

    cli(data_dir)
        .args([
            "workout", "log-set", &workout, "--item", &plan.squat_item, "--set", "4", "--reps", "5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidState"));

    assert_eq!(show_json(data_dir, &workout)["set_results"].as_array().unwrap().len(), 3);
}

#[test]
fn test_unknown_label_is_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let plan = build_plan(data_dir);
    let workout = run(data_dir, &["workout", "start", "--session", &plan.session]);

    cli(data_dir)
        .args([
            "workout", "log-set", &workout, "--exercise", "Back Squat", "--block", "Z", "--reps",
            "5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidState"));
}

#[test]
fn test_conflicting_result_type_is_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let plan = build_plan(data_dir);
    let workout = run(data_dir, &["workout", "start", "--session", &plan.session]);

    cli(data_dir)
        .args([
            "workout", "log-set", &workout, "--item", &plan.squat_item, "--type", "tabata",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation"));
}

#[test]
fn test_unknown_session_is_not_found() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args([
            "workout",
            "start",
            "--session",
            "6f1c6a8e-0000-4000-8000-000000000000",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));
}

#[test]
fn test_strict_exercises_do_not_create_stubs() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let program = run(data_dir, &["program", "create", "Strict", "--weeks", "2"]);
    let session = run(data_dir, &["session", "add", &program, "Day 1"]);
    let block = run(data_dir, &["block", "add", &session, "A"]);

    cli(data_dir)
        .args([
            "--strict-exercises",
            "item",
            "add",
            &block,
            "--exercise",
            "Snatch",
            "--reps",
            "3",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));

    assert_eq!(run(data_dir, &["exercise", "list"]), "");
}

#[test]
fn test_invalid_prescription_is_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let program = run(data_dir, &["program", "create", "Drops", "--weeks", "2"]);
    let session = run(data_dir, &["session", "add", &program, "Day 1"]);
    let block = run(data_dir, &["block", "add", &session, "A", "--type", "drop_set"]);

    // Two stages but only one reduction
    cli(data_dir)
        .args([
            "item",
            "add",
            &block,
            "--exercise",
            "Curl",
            "--set-type",
            "drop_set",
            "--drop-stages",
            "2",
            "--drop-reductions",
            "20",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation"));
}

#[test]
fn test_analytics_and_report() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let plan = build_plan(data_dir);
    record_workout(data_dir, &plan);

    let json = run(data_dir, &["analytics", "--json"]);
    let report: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(report["total_workouts"], 1);
    assert_eq!(report["total_volume_load"], 1500.0);
    assert_eq!(report["strength"]["Back Squat"]["max_weight"], 100.0);
    assert_eq!(report["block_type_success"]["emom"], 100.0);
    assert_eq!(report["trends"]["volume_load"].as_array().unwrap().len(), 1);

    cli(data_dir)
        .arg("analytics")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workouts:          1"));

    cli(data_dir)
        .args(["report", "--type", "emom"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== EMOM Performance Report ==="))
        .stdout(predicate::str::contains("Average Completion Rate: 100.0%"));

    cli(data_dir)
        .args(["report", "--type", "tabata"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No Tabata workouts found in the specified date range.",
        ));
}

#[test]
fn test_export_writes_csv() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let plan = build_plan(data_dir);
    record_workout(data_dir, &plan);

    let csv_path = data_dir.join("export").join("sets.csv");
    cli(data_dir)
        .args(["export", "--output"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 set results"));

    let content = fs::read_to_string(&csv_path).expect("Failed to read CSV");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("workout_id,date,subject_id,exercise"));
    assert!(lines[1].contains("Back Squat"));
    assert!(lines[1].contains("500.0"));
}

#[test]
fn test_delete_workout_cascades() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let plan = build_plan(data_dir);
    let workout = record_workout(data_dir, &plan);

    run(data_dir, &["workout", "delete", &workout]);
    cli(data_dir)
        .args(["workout", "show", &workout])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));
    assert_eq!(run(data_dir, &["workout", "list"]), "");
}

#[test]
fn test_planned_exercise_cannot_be_deleted() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let plan = build_plan(data_dir);
    let listing = run(data_dir, &["exercise", "list", "--search", "Back Squat"]);
    let squat = listing.split_whitespace().next().unwrap().to_string();

    cli(data_dir)
        .args(["exercise", "delete", &squat])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidState"));

    run(data_dir, &["program", "delete", &plan.program]);
    cli(data_dir)
        .args(["exercise", "delete", &squat])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted exercise"));
    assert_eq!(run(data_dir, &["exercise", "list", "--search", "Back Squat"]), "");
}

#[test]
fn test_ad_hoc_workout_with_score() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let workout = run(data_dir, &["workout", "start", "--ad-hoc", "--date", "2024-05-01"]);

    run(
        data_dir,
        &[
            "workout", "log-set", &workout, "--exercise", "Thruster", "--block", "WOD", "--type",
            "amrap", "--round", "1", "--reps", "21",
        ],
    );
    cli(data_dir)
        .args(["workout", "score", &workout, "21+5", "--rounds", "21", "--rx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("21+5"));
    run(data_dir, &["workout", "finish", &workout, "--status", "completed"]);

    let json = show_json(data_dir, &workout);
    assert_eq!(json["wod_result"], "21+5");
    assert_eq!(json["total_rounds"], 21);
    assert_eq!(json["completion_status"], "completed");
    assert_eq!(json["aggregates"]["total_reps"], 21);
}
