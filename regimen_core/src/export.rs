//! CSV export of recorded set results.
//!
//! One row per set result. Rows are written through a `csv::Writer` into a
//! temp file beside the target, fsynced, then renamed over it.

use crate::results::{SetResult, WorkoutResult};
use crate::store::{Repository, WorkoutFilter};
use crate::{Error, ExerciseId, Result};
use std::collections::HashMap;
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    workout_id: String,
    date: String,
    subject_id: String,
    exercise: String,
    block_label: String,
    block_item_order: u32,
    sequence: u32,
    result_type: String,
    reps: Option<u32>,
    weight: Option<f64>,
    unit: &'static str,
    rpe: Option<f64>,
    volume_load: Option<f64>,
}

impl CsvRow {
    fn new(workout: &WorkoutResult, set: &SetResult, exercise: &str) -> Self {
        CsvRow {
            workout_id: workout.id.to_string(),
            date: workout.date.to_string(),
            subject_id: workout.subject_id.to_string(),
            exercise: exercise.to_string(),
            block_label: set.block_label.clone(),
            block_item_order: set.block_item_order,
            sequence: set.sequence_number(),
            result_type: set.result_type.to_string(),
            reps: set.performed_reps,
            weight: set.weight,
            unit: set.weight_unit.symbol(),
            rpe: set.rpe,
            volume_load: set.volume_load(),
        }
    }
}

/// Write every set of the matching workouts to `csv_path`.
///
/// Returns the number of rows written. A set whose exercise is missing from
/// the catalog aborts the export and leaves any existing file untouched.
pub fn export_set_results(
    repo: &dyn Repository,
    filter: &WorkoutFilter,
    csv_path: &Path,
) -> Result<usize> {
    let mut workouts = repo.find_workouts(filter)?;
    workouts.sort_by(crate::results::chronological);
    let names: HashMap<ExerciseId, String> = repo
        .list_exercises()?
        .into_iter()
        .map(|e| (e.id, e.name))
        .collect();

    let mut rows = Vec::new();
    for workout in &workouts {
        for set in workout.set_results() {
            let exercise = names.get(&set.exercise_id).ok_or_else(|| {
                Error::InvalidState(format!(
                    "workout {} set {} references unknown exercise {}",
                    workout.id, set.id, set.exercise_id
                ))
            })?;
            rows.push(CsvRow::new(workout, set, exercise));
        }
    }

    let parent = match csv_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    // Write to a sibling temp file, then rename over the target
    let temp = NamedTempFile::new_in(parent)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(temp);
    for row in &rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    let temp = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    temp.as_file().sync_all()?;
    temp.persist(csv_path).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Exported {} set results to {:?}", rows.len(), csv_path);
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::{Exercise, SubjectId};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_export_writes_header_and_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("out").join("sets.csv");
        let repo = MemoryStore::new();
        let squat = Exercise::new("Back Squat");
        repo.save_exercise(&squat).unwrap();

        let started = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
        let subject = SubjectId::new();
        let mut workout = WorkoutResult::new(subject, None, started.date_naive(), started);
        workout
            .insert_set(SetResult::traditional(squat.id, "A", 1, 1, 5, 100.0))
            .unwrap();
        workout
            .insert_set(SetResult::traditional(squat.id, "A", 1, 2, 5, 105.0))
            .unwrap();
        repo.save_workout(&workout).unwrap();

        let rows = export_set_results(&repo, &WorkoutFilter::subject(subject), &csv_path).unwrap();
        assert_eq!(rows, 2);

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "workout_id");
        assert_eq!(&headers[3], "exercise");
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][3], "Back Squat");
        assert_eq!(&records[1][9], "105.0");
        assert_eq!(&records[1][12], "525.0");
    }

    #[test]
    fn test_export_truncates_existing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("sets.csv");
        std::fs::write(&csv_path, "stale content that should vanish\n").unwrap();

        let repo = MemoryStore::new();
        let rows = export_set_results(&repo, &WorkoutFilter::default(), &csv_path).unwrap();
        assert_eq!(rows, 0);
        let contents = std::fs::read_to_string(&csv_path).unwrap();
        assert!(!contents.contains("stale"));
    }

    #[test]
    fn test_failed_export_keeps_previous_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("sets.csv");
        std::fs::write(&csv_path, "previous export\n").unwrap();

        let repo = MemoryStore::new();
        let squat = Exercise::new("Back Squat");
        repo.save_exercise(&squat).unwrap();
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
        let mut workout = WorkoutResult::new(SubjectId::new(), None, started.date_naive(), started);
        workout
            .insert_set(SetResult::traditional(squat.id, "A", 1, 1, 5, 100.0))
            .unwrap();
        workout
            .insert_set(SetResult::traditional(ExerciseId::new(), "B", 1, 1, 8, 40.0))
            .unwrap();
        repo.save_workout(&workout).unwrap();

        let err = export_set_results(&repo, &WorkoutFilter::default(), &csv_path).unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(std::fs::read_to_string(&csv_path).unwrap(), "previous export\n");
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
