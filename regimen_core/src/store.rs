//! Persistence collaborator.
//!
//! Services talk to an `Arc<dyn Repository>`. Two backends share one
//! [`Database`] document:
//! - [`MemoryStore`]: `RwLock` in process, used by tests and embedding
//! - [`FileStore`]: a single JSON file guarded by an `fs2` lock on a
//!   sidecar `.lock` file, written atomically through a temp file
//!
//! Every write runs against a copy and only lands if the closure and the
//! structural validation succeed.

use crate::program::{Program, SessionTemplate};
use crate::results::{chronological, WorkoutResult};
use crate::{
    BlockItemId, Error, Exercise, ExerciseId, ProgramId, Result, SessionTemplateId, SubjectId,
    WorkoutResultId,
};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tempfile::NamedTempFile;

// ============================================================================
// Query Filter
// ============================================================================

/// Predicate over workout results; unset fields match everything
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkoutFilter {
    pub subject_id: Option<SubjectId>,
    pub template_id: Option<SessionTemplateId>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl WorkoutFilter {
    pub fn subject(subject_id: SubjectId) -> Self {
        Self {
            subject_id: Some(subject_id),
            ..Self::default()
        }
    }

    pub fn template(template_id: SessionTemplateId) -> Self {
        Self {
            template_id: Some(template_id),
            ..Self::default()
        }
    }

    /// Inclusive date range
    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn matches(&self, workout: &WorkoutResult) -> bool {
        self.subject_id.map_or(true, |s| workout.subject_id == s)
            && self
                .template_id
                .map_or(true, |t| workout.template_id == Some(t))
            && self.start.map_or(true, |s| workout.date >= s)
            && self.end.map_or(true, |e| workout.date <= e)
    }
}

// ============================================================================
// Repository
// ============================================================================

pub trait Repository: Send + Sync {
    fn save_program(&self, program: &Program) -> Result<()>;
    fn find_program(&self, id: ProgramId) -> Result<Option<Program>>;
    fn delete_program(&self, id: ProgramId) -> Result<bool>;
    /// Start date descending, undated last, ties by title
    fn list_programs(&self) -> Result<Vec<Program>>;
    /// Apply `f` to a copy, validate the tree, then store it
    fn update_program(
        &self,
        id: ProgramId,
        f: &mut dyn FnMut(&mut Program) -> Result<()>,
    ) -> Result<Program>;
    fn find_session_template(
        &self,
        id: SessionTemplateId,
    ) -> Result<Option<(ProgramId, SessionTemplate)>>;

    fn save_exercise(&self, exercise: &Exercise) -> Result<()>;
    fn find_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>>;
    /// Refuses with `InvalidState` while a plan item or set result
    /// references the exercise
    fn delete_exercise(&self, id: ExerciseId) -> Result<bool>;
    /// Sorted by name
    fn list_exercises(&self) -> Result<Vec<Exercise>>;
    /// Atomic create-or-get by case-insensitive name. `create` runs only on
    /// a miss; the flag reports whether it did.
    fn find_or_insert_exercise(
        &self,
        name: &str,
        create: &mut dyn FnMut() -> Result<Exercise>,
    ) -> Result<(Exercise, bool)>;

    fn save_workout(&self, workout: &WorkoutResult) -> Result<()>;
    fn find_workout(&self, id: WorkoutResultId) -> Result<Option<WorkoutResult>>;
    /// Cascades to the owned block and set results
    fn delete_workout(&self, id: WorkoutResultId) -> Result<bool>;
    fn update_workout(
        &self,
        id: WorkoutResultId,
        f: &mut dyn FnMut(&mut WorkoutResult) -> Result<()>,
    ) -> Result<WorkoutResult>;
    /// Chronological by date then start time
    fn find_workouts(&self, filter: &WorkoutFilter) -> Result<Vec<WorkoutResult>>;
    /// Reverse lookup through the plan index
    fn find_workouts_for_item(&self, item_id: BlockItemId) -> Result<Vec<WorkoutResult>>;

    fn get_program(&self, id: ProgramId) -> Result<Program> {
        self.find_program(id)?
            .ok_or_else(|| Error::not_found("program", id))
    }

    fn get_exercise(&self, id: ExerciseId) -> Result<Exercise> {
        self.find_exercise(id)?
            .ok_or_else(|| Error::not_found("exercise", id))
    }

    fn get_session_template(&self, id: SessionTemplateId) -> Result<(ProgramId, SessionTemplate)> {
        self.find_session_template(id)?
            .ok_or_else(|| Error::not_found("session template", id))
    }

    fn get_workout(&self, id: WorkoutResultId) -> Result<WorkoutResult> {
        self.find_workout(id)?
            .ok_or_else(|| Error::not_found("workout result", id))
    }
}

// ============================================================================
// Database Document
// ============================================================================

/// Everything the stores persist, as one serializable document
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    programs: BTreeMap<ProgramId, Program>,
    #[serde(default)]
    exercises: BTreeMap<ExerciseId, Exercise>,
    #[serde(default)]
    workouts: BTreeMap<WorkoutResultId, WorkoutResult>,
    /// planned item id → results that executed it
    #[serde(skip)]
    item_index: HashMap<BlockItemId, BTreeSet<WorkoutResultId>>,
}

impl Database {
    fn from_json(bytes: &[u8]) -> Result<Self> {
        let mut db: Database = serde_json::from_slice(bytes)?;
        db.rebuild_index();
        Ok(db)
    }

    fn rebuild_index(&mut self) {
        self.item_index.clear();
        let ids: Vec<WorkoutResultId> = self.workouts.keys().copied().collect();
        for id in ids {
            self.index_workout(id);
        }
    }

    fn index_workout(&mut self, id: WorkoutResultId) {
        let Some(workout) = self.workouts.get(&id) else {
            return;
        };
        for item_id in workout.set_results().iter().filter_map(|s| s.planned_item_id) {
            self.item_index.entry(item_id).or_default().insert(id);
        }
    }

    fn unindex_workout(&mut self, id: WorkoutResultId) {
        self.item_index.retain(|_, results| {
            results.remove(&id);
            !results.is_empty()
        });
    }

    fn save_program(&mut self, program: &Program) -> Result<()> {
        program.validate()?;
        self.programs.insert(program.id, program.clone());
        Ok(())
    }

    fn list_programs(&self) -> Vec<Program> {
        let mut programs: Vec<Program> = self.programs.values().cloned().collect();
        programs.sort_by(|a, b| match (a.start_date, b.start_date) {
            (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.title.cmp(&b.title)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.title.cmp(&b.title),
        });
        programs
    }

    fn update_program(
        &mut self,
        id: ProgramId,
        f: &mut dyn FnMut(&mut Program) -> Result<()>,
    ) -> Result<Program> {
        let mut program = self
            .programs
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("program", id))?;
        f(&mut program)?;
        program.id = id;
        self.save_program(&program)?;
        Ok(program)
    }

    fn find_session_template(&self, id: SessionTemplateId) -> Option<(ProgramId, SessionTemplate)> {
        self.programs
            .values()
            .find_map(|p| p.find_session(id).map(|s| (p.id, s.clone())))
    }

    fn delete_exercise(&mut self, id: ExerciseId) -> Result<bool> {
        let planned = self.programs.values().find(|p| {
            p.sessions
                .iter()
                .flat_map(|s| &s.blocks)
                .flat_map(|b| &b.items)
                .any(|i| i.exercise_id == id)
        });
        if let Some(program) = planned {
            return Err(Error::InvalidState(format!(
                "exercise {} is planned in program {}",
                id, program.id
            )));
        }
        let recorded = self
            .workouts
            .values()
            .find(|w| w.set_results().iter().any(|s| s.exercise_id == id));
        if let Some(workout) = recorded {
            return Err(Error::InvalidState(format!(
                "exercise {} is recorded in workout {}",
                id, workout.id
            )));
        }
        Ok(self.exercises.remove(&id).is_some())
    }

    fn list_exercises(&self) -> Vec<Exercise> {
        let mut exercises: Vec<Exercise> = self.exercises.values().cloned().collect();
        exercises.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        exercises
    }

    fn find_or_insert_exercise(
        &mut self,
        name: &str,
        create: &mut dyn FnMut() -> Result<Exercise>,
    ) -> Result<(Exercise, bool)> {
        if let Some(existing) = self.exercises.values().find(|e| e.matches_name(name)) {
            return Ok((existing.clone(), false));
        }
        let exercise = create()?;
        self.exercises.insert(exercise.id, exercise.clone());
        Ok((exercise, true))
    }

    fn save_workout(&mut self, workout: &WorkoutResult) {
        self.unindex_workout(workout.id);
        self.workouts.insert(workout.id, workout.clone());
        self.index_workout(workout.id);
    }

    fn delete_workout(&mut self, id: WorkoutResultId) -> bool {
        self.unindex_workout(id);
        self.workouts.remove(&id).is_some()
    }

    fn update_workout(
        &mut self,
        id: WorkoutResultId,
        f: &mut dyn FnMut(&mut WorkoutResult) -> Result<()>,
    ) -> Result<WorkoutResult> {
        let mut workout = self
            .workouts
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("workout result", id))?;
        f(&mut workout)?;
        workout.id = id;
        self.save_workout(&workout);
        Ok(workout)
    }

    fn find_workouts(&self, filter: &WorkoutFilter) -> Vec<WorkoutResult> {
        let mut found: Vec<WorkoutResult> = self
            .workouts
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect();
        found.sort_by(chronological);
        found
    }

    fn find_workouts_for_item(&self, item_id: BlockItemId) -> Vec<WorkoutResult> {
        let mut found: Vec<WorkoutResult> = self
            .item_index
            .get(&item_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.workouts.get(id).cloned())
            .collect();
        found.sort_by(chronological);
        found
    }
}

/// Transactional access to a whole [`Database`]; implementing it yields
/// a [`Repository`]
pub trait Storage: Send + Sync {
    fn read<R>(&self, f: impl FnOnce(&Database) -> Result<R>) -> Result<R>;
    fn write<R>(&self, f: impl FnOnce(&mut Database) -> Result<R>) -> Result<R>;
}

impl<S: Storage> Repository for S {
    fn save_program(&self, program: &Program) -> Result<()> {
        self.write(|db| db.save_program(program))
    }

    fn find_program(&self, id: ProgramId) -> Result<Option<Program>> {
        self.read(|db| Ok(db.programs.get(&id).cloned()))
    }

    fn delete_program(&self, id: ProgramId) -> Result<bool> {
        self.write(|db| Ok(db.programs.remove(&id).is_some()))
    }

    fn list_programs(&self) -> Result<Vec<Program>> {
        self.read(|db| Ok(db.list_programs()))
    }

    fn update_program(
        &self,
        id: ProgramId,
        f: &mut dyn FnMut(&mut Program) -> Result<()>,
    ) -> Result<Program> {
        self.write(|db| db.update_program(id, f))
    }

    fn find_session_template(
        &self,
        id: SessionTemplateId,
    ) -> Result<Option<(ProgramId, SessionTemplate)>> {
        self.read(|db| Ok(db.find_session_template(id)))
    }

    fn save_exercise(&self, exercise: &Exercise) -> Result<()> {
        if exercise.name.trim().is_empty() {
            return Err(Error::Validation("exercise name must not be empty".into()));
        }
        self.write(|db| {
            db.exercises.insert(exercise.id, exercise.clone());
            Ok(())
        })
    }

    fn find_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>> {
        self.read(|db| Ok(db.exercises.get(&id).cloned()))
    }

    fn delete_exercise(&self, id: ExerciseId) -> Result<bool> {
        self.write(|db| db.delete_exercise(id))
    }

    fn list_exercises(&self) -> Result<Vec<Exercise>> {
        self.read(|db| Ok(db.list_exercises()))
    }

    fn find_or_insert_exercise(
        &self,
        name: &str,
        create: &mut dyn FnMut() -> Result<Exercise>,
    ) -> Result<(Exercise, bool)> {
        self.write(|db| db.find_or_insert_exercise(name, create))
    }

    fn save_workout(&self, workout: &WorkoutResult) -> Result<()> {
        self.write(|db| {
            db.save_workout(workout);
            Ok(())
        })
    }

    fn find_workout(&self, id: WorkoutResultId) -> Result<Option<WorkoutResult>> {
        self.read(|db| Ok(db.workouts.get(&id).cloned()))
    }

    fn delete_workout(&self, id: WorkoutResultId) -> Result<bool> {
        self.write(|db| Ok(db.delete_workout(id)))
    }

    fn update_workout(
        &self,
        id: WorkoutResultId,
        f: &mut dyn FnMut(&mut WorkoutResult) -> Result<()>,
    ) -> Result<WorkoutResult> {
        self.write(|db| db.update_workout(id, f))
    }

    fn find_workouts(&self, filter: &WorkoutFilter) -> Result<Vec<WorkoutResult>> {
        self.read(|db| Ok(db.find_workouts(filter)))
    }

    fn find_workouts_for_item(&self, item_id: BlockItemId) -> Result<Vec<WorkoutResult>> {
        self.read(|db| Ok(db.find_workouts_for_item(item_id)))
    }
}

// ============================================================================
// Memory Store
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    db: RwLock<Database>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStore {
    fn read<R>(&self, f: impl FnOnce(&Database) -> Result<R>) -> Result<R> {
        // Writers only swap in fully built values, so a poisoned lock still
        // guards a consistent database
        let db = self.db.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&db)
    }

    fn write<R>(&self, f: impl FnOnce(&mut Database) -> Result<R>) -> Result<R> {
        let mut db = self.db.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut db)
    }
}

// ============================================================================
// File Store
// ============================================================================

/// JSON database file with cross-process locking
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "regimen.json";

    /// Store rooted in a data directory, created if missing
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self::at(data_dir.join(Self::FILE_NAME)))
    }

    pub fn at(path: PathBuf) -> Self {
        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");
        Self {
            lock_path: PathBuf::from(lock_name),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<File> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)?)
    }

    /// Missing file is an empty database; unreadable content is an error
    fn load(&self) -> Result<Database> {
        if !self.path.exists() {
            tracing::debug!("No database at {:?}, starting empty", self.path);
            return Ok(Database::default());
        }
        let mut contents = Vec::new();
        let mut reader = std::io::BufReader::new(File::open(&self.path)?);
        reader.read_to_end(&mut contents)?;
        if contents.is_empty() {
            return Ok(Database::default());
        }
        Database::from_json(&contents).map_err(|e| {
            tracing::error!("Failed to parse database {:?}: {}", self.path, e);
            e
        })
    }

    /// Atomically replace the database file:
    /// 1. Write to a temp file in the same directory
    /// 2. Sync to disk
    /// 3. Rename over the original
    fn persist(&self, db: &Database) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "database path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, db)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved database to {:?}", self.path);
        Ok(())
    }
}

impl Storage for FileStore {
    fn read<R>(&self, f: impl FnOnce(&Database) -> Result<R>) -> Result<R> {
        let lock = self.lock_file()?;
        lock.lock_shared()?;
        let result = self.load().and_then(|db| f(&db));
        FileExt::unlock(&lock)?;
        result
    }

    fn write<R>(&self, f: impl FnOnce(&mut Database) -> Result<R>) -> Result<R> {
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;
        let result = self.load().and_then(|mut db| {
            let value = f(&mut db)?;
            self.persist(&db)?;
            Ok(value)
        });
        FileExt::unlock(&lock)?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prescription::{AdvancedPrescription, Prescription};
    use crate::program::{BlockItem, ExerciseBlock};
    use crate::results::SetResult;
    use crate::{BlockType, ExerciseCategory};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn workout_on(subject: SubjectId, day: u32) -> WorkoutResult {
        let started = Utc.with_ymd_and_hms(2024, 5, day, 7, 0, 0).unwrap();
        WorkoutResult::new(subject, None, started.date_naive(), started)
    }

    fn backends() -> (tempfile::TempDir, Vec<Arc<dyn Repository>>) {
        let dir = tempfile::tempdir().unwrap();
        let file: Arc<dyn Repository> = Arc::new(FileStore::open(dir.path()).unwrap());
        let memory: Arc<dyn Repository> = Arc::new(MemoryStore::new());
        (dir, vec![memory, file])
    }

    #[test]
    fn test_program_roundtrip_and_listing_order() {
        let (_dir, repos) = backends();
        for repo in repos {
            let mut early = Program::new("Early", 4);
            early.start(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
            let mut late = Program::new("Late", 4);
            late.start(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
            let undated = Program::new("Undated", 0);

            repo.save_program(&undated).unwrap();
            repo.save_program(&early).unwrap();
            repo.save_program(&late).unwrap();

            let titles: Vec<String> = repo
                .list_programs()
                .unwrap()
                .into_iter()
                .map(|p| p.title)
                .collect();
            assert_eq!(titles, vec!["Late", "Early", "Undated"]);
            assert_eq!(repo.get_program(early.id).unwrap(), early);

            assert!(repo.delete_program(early.id).unwrap());
            assert!(repo.get_program(early.id).unwrap_err().is_not_found());
        }
    }

    #[test]
    fn test_failed_update_leaves_program_untouched() {
        let (_dir, repos) = backends();
        for repo in repos {
            let program = Program::new("Base", 4);
            repo.save_program(&program).unwrap();

            let err = repo
                .update_program(program.id, &mut |p| {
                    p.title = "Changed".into();
                    Err(Error::InvalidState("abort".into()))
                })
                .unwrap_err();
            assert!(err.is_invalid_state());
            assert_eq!(repo.get_program(program.id).unwrap().title, "Base");
        }
    }

    #[test]
    fn test_find_or_insert_exercise_creates_once() {
        let (_dir, repos) = backends();
        for repo in repos {
            let mut make =
                || -> Result<Exercise> { Ok(Exercise::stub("Kettlebell Swing", ExerciseCategory::Kettlebell)) };
            let (first, created) = repo.find_or_insert_exercise("Kettlebell Swing", &mut make).unwrap();
            assert!(created);
            let (second, created) = repo.find_or_insert_exercise("kettlebell swing", &mut make).unwrap();
            assert!(!created);
            assert_eq!(first.id, second.id);
            assert_eq!(repo.list_exercises().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_referenced_exercise_cannot_be_deleted() {
        let (_dir, repos) = backends();
        for repo in repos {
            let squat = Exercise::new("Back Squat");
            let lunge = Exercise::new("Walking Lunge");
            let unused = Exercise::new("Sled Push");
            for e in [&squat, &lunge, &unused] {
                repo.save_exercise(e).unwrap();
            }

            let mut workout = workout_on(SubjectId::new(), 2);
            workout
                .insert_set(SetResult::traditional(squat.id, "A", 1, 1, 5, 100.0))
                .unwrap();
            repo.save_workout(&workout).unwrap();

            let mut block = ExerciseBlock::new("A", BlockType::StraightSets);
            block.push_item(BlockItem::new(
                lunge.id,
                Prescription::Advanced(AdvancedPrescription::straight_sets(3, 10)),
            ));
            let mut session = SessionTemplate::new("Day 1");
            session.push_block(block).unwrap();
            let mut program = Program::new("Base", 4);
            program.push_session(session);
            repo.save_program(&program).unwrap();

            let err = repo.delete_exercise(squat.id).unwrap_err();
            assert!(err.is_invalid_state());
            assert!(err.to_string().contains(&workout.id.to_string()));
            let err = repo.delete_exercise(lunge.id).unwrap_err();
            assert!(err.is_invalid_state());
            assert!(err.to_string().contains(&program.id.to_string()));
            assert!(repo.find_exercise(squat.id).unwrap().is_some());
            assert!(repo.find_exercise(lunge.id).unwrap().is_some());

            assert!(repo.delete_exercise(unused.id).unwrap());
            assert!(!repo.delete_exercise(unused.id).unwrap());

            assert!(repo.delete_workout(workout.id).unwrap());
            assert!(repo.delete_exercise(squat.id).unwrap());
            assert_eq!(repo.list_exercises().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_workout_filters_are_chronological() {
        let (_dir, repos) = backends();
        for repo in repos {
            let subject = SubjectId::new();
            let other = SubjectId::new();
            let third = workout_on(subject, 3);
            let first = workout_on(subject, 1);
            let elsewhere = workout_on(other, 2);
            repo.save_workout(&third).unwrap();
            repo.save_workout(&first).unwrap();
            repo.save_workout(&elsewhere).unwrap();

            let mine = repo.find_workouts(&WorkoutFilter::subject(subject)).unwrap();
            let ids: Vec<WorkoutResultId> = mine.iter().map(|w| w.id).collect();
            assert_eq!(ids, vec![first.id, third.id]);

            let ranged = repo
                .find_workouts(&WorkoutFilter::subject(subject).between(
                    NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                    NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
                ))
                .unwrap();
            assert_eq!(ranged.len(), 1);
            assert_eq!(ranged[0].id, third.id);
        }
    }

    #[test]
    fn test_plan_index_tracks_planned_items() {
        let (_dir, repos) = backends();
        for repo in repos {
            let item = BlockItemId::new();
            let mut workout = workout_on(SubjectId::new(), 1);
            let mut set = SetResult::traditional(ExerciseId::new(), "A", 1, 1, 5, 100.0);
            set.planned_item_id = Some(item);
            workout.insert_set(set).unwrap();
            repo.save_workout(&workout).unwrap();

            let found = repo.find_workouts_for_item(item).unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id, workout.id);

            assert!(repo.delete_workout(workout.id).unwrap());
            assert!(repo.find_workouts_for_item(item).unwrap().is_empty());
        }
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let item = BlockItemId::new();
        let mut workout = workout_on(SubjectId::new(), 1);
        let mut set = SetResult::traditional(ExerciseId::new(), "A", 1, 1, 5, 100.0);
        set.planned_item_id = Some(item);
        workout.insert_set(set).unwrap();

        FileStore::open(dir.path()).unwrap().save_workout(&workout).unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        let loaded = reopened.get_workout(workout.id).unwrap();
        assert_eq!(loaded, workout);
        assert_eq!(loaded.aggregates().total_reps, 5);
        // Index is rebuilt from disk
        assert_eq!(reopened.find_workouts_for_item(item).unwrap().len(), 1);
    }

    #[test]
    fn test_corrupted_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(FileStore::FILE_NAME), "{ not json").unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(store.list_programs(), Err(Error::Json(_))));
        // A failed read must not clobber the file
        assert!(store.save_program(&Program::new("P", 1)).is_err());
        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents, "{ not json");
    }

    #[test]
    fn test_concurrent_file_writers_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let subject = SubjectId::new();

        let handles: Vec<_> = (1..=8)
            .map(|day| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.save_workout(&workout_on(subject, day)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(
            store.find_workouts(&WorkoutFilter::subject(subject)).unwrap().len(),
            8
        );
    }
}
