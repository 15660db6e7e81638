//! Recording what was performed: start → record sets/blocks → finish.
//!
//! Every mutation of one workout result holds that result's entry in
//! [`SessionLocks`] for its whole read-derive-write pass, so two finishes
//! on the same id are serialized while different ids proceed in parallel.
//! The store is never re-entered from inside an update closure.

use crate::clock::Clock;
use crate::metrics;
use crate::program::SessionTemplate;
use crate::results::{BlockMetrics, BlockResult, SetResult, WorkoutResult};
use crate::store::{Repository, WorkoutFilter};
use crate::{
    BlockItemId, BlockType, CompletionStatus, Error, ExerciseBlockId, ExerciseId, Result,
    ResultType, SessionTemplateId, SetResultId, SubjectId, WeightUnit, WorkoutResultId,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ============================================================================
// Per-Result Locks
// ============================================================================

#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<WorkoutResultId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    /// The lock for one result id; idle entries are pruned on the way
    pub fn for_id(&self, id: WorkoutResultId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.retain(|other, lock| *other == id || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(id).or_default())
    }

    fn forget(&self, id: WorkoutResultId) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.remove(&id);
    }
}

macro_rules! hold {
    ($locks:expr, $id:expr) => {
        let lock = $locks.for_id($id);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());
    };
}

// ============================================================================
// Entries
// ============================================================================

/// One set as reported by the caller.
///
/// With `planned_item_id`, label, item order, exercise and result type
/// come from the plan; explicit values must agree with it.
#[derive(Clone, Debug, Default)]
pub struct SetEntry {
    pub planned_item_id: Option<BlockItemId>,
    pub exercise_id: Option<ExerciseId>,
    pub block_label: Option<String>,
    pub block_item_order: Option<u32>,
    pub result_type: Option<ResultType>,
    pub set_number: u32,
    pub round_number: Option<u32>,
    pub interval_number: Option<u32>,

    pub target_reps: Option<u32>,
    pub performed_reps: Option<u32>,
    pub weight: Option<f64>,
    pub weight_unit: WeightUnit,
    pub work_time_seconds: Option<u32>,
    pub rest_time_seconds: Option<u32>,
    pub total_time_seconds: Option<u32>,
    pub distance: Option<f64>,
    pub rpe: Option<f64>,
    pub rir: Option<u32>,
    pub heart_rate: Option<u32>,

    pub completed_rounds: Option<u32>,
    pub seconds_remaining: Option<i32>,
    pub drop_set_reps: Vec<u32>,
    pub drop_set_weights: Vec<f64>,
    pub cluster_number: Option<u32>,
    pub rest_pause_number: Option<u32>,
    pub reached_failure: bool,
    pub failure_reason: Option<String>,
    pub missed_reps: Option<u32>,
    pub notes: Option<String>,
}

impl SetEntry {
    pub fn planned(item_id: BlockItemId, set_number: u32) -> Self {
        Self {
            planned_item_id: Some(item_id),
            set_number,
            ..Self::default()
        }
    }

    pub fn ad_hoc(
        exercise_id: ExerciseId,
        block_label: impl Into<String>,
        block_item_order: u32,
        set_number: u32,
    ) -> Self {
        Self {
            exercise_id: Some(exercise_id),
            block_label: Some(block_label.into()),
            block_item_order: Some(block_item_order),
            set_number,
            ..Self::default()
        }
    }

    pub fn reps(mut self, reps: u32) -> Self {
        self.performed_reps = Some(reps);
        self
    }

    pub fn weight(mut self, weight: f64, unit: WeightUnit) -> Self {
        self.weight = Some(weight);
        self.weight_unit = unit;
        self
    }

    pub fn rpe(mut self, rpe: f64) -> Self {
        self.rpe = Some(rpe);
        self
    }

    pub fn interval(mut self, interval: u32) -> Self {
        self.interval_number = Some(interval);
        self
    }

    pub fn round(mut self, round: u32) -> Self {
        self.round_number = Some(round);
        self
    }

    pub fn result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = Some(result_type);
        self
    }

    fn into_set(
        self,
        exercise_id: ExerciseId,
        block_label: String,
        block_item_order: u32,
        result_type: ResultType,
    ) -> SetResult {
        let mut set = SetResult::new(
            exercise_id,
            block_label,
            block_item_order,
            self.set_number,
            result_type,
        );
        set.planned_item_id = self.planned_item_id;
        set.round_number = self.round_number;
        set.interval_number = self.interval_number;
        set.target_reps = self.target_reps;
        set.performed_reps = self.performed_reps;
        set.weight = self.weight;
        set.weight_unit = self.weight_unit;
        set.work_time_seconds = self.work_time_seconds;
        set.rest_time_seconds = self.rest_time_seconds;
        set.total_time_seconds = self.total_time_seconds;
        set.distance = self.distance;
        set.rpe = self.rpe;
        set.rir = self.rir;
        set.heart_rate = self.heart_rate;
        set.completed_rounds = self.completed_rounds;
        set.seconds_remaining = self.seconds_remaining;
        set.completed_in_time = self.seconds_remaining.map(|s| s >= 0);
        set.drop_set_reps = self.drop_set_reps;
        set.drop_set_weights = self.drop_set_weights;
        set.cluster_number = self.cluster_number;
        set.rest_pause_number = self.rest_pause_number;
        set.reached_failure = self.reached_failure;
        set.failure_reason = self.failure_reason;
        set.missed_reps = self.missed_reps;
        set.notes = self.notes;
        set
    }
}

/// One executed block as reported by the caller
#[derive(Clone, Debug, Default)]
pub struct BlockEntry {
    pub planned_block_id: Option<ExerciseBlockId>,
    pub block_label: Option<String>,
    pub block_order: Option<u32>,
    pub block_type: Option<BlockType>,
    /// Overrides the plan's `total_rounds`
    pub target_rounds: Option<u32>,
    pub metrics: BlockMetrics,
    pub total_time_seconds: Option<u32>,
    pub work_time_seconds: Option<u32>,
    pub rest_time_seconds: Option<u32>,
    pub average_rpe: Option<f64>,
    pub notes: Option<String>,
    pub modifications: Option<String>,
}

impl BlockEntry {
    pub fn planned(block_id: ExerciseBlockId, metrics: BlockMetrics) -> Self {
        Self {
            planned_block_id: Some(block_id),
            metrics,
            ..Self::default()
        }
    }

    pub fn ad_hoc(label: impl Into<String>, block_type: BlockType, metrics: BlockMetrics) -> Self {
        Self {
            block_label: Some(label.into()),
            block_type: Some(block_type),
            metrics,
            ..Self::default()
        }
    }
}

// ============================================================================
// Service
// ============================================================================

pub struct RecordingService {
    repo: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    locks: SessionLocks,
}

impl RecordingService {
    pub fn new(repo: Arc<dyn Repository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            clock,
            locks: SessionLocks::default(),
        }
    }

    pub fn start_session(
        &self,
        template_id: SessionTemplateId,
        subject_id: SubjectId,
    ) -> Result<WorkoutResult> {
        let (_, template) = self.repo.get_session_template(template_id)?;
        let workout = WorkoutResult::new(
            subject_id,
            Some(template_id),
            self.clock.today(),
            self.clock.now(),
        );
        self.repo.save_workout(&workout)?;
        tracing::info!(
            "Started session '{}' for subject {} ({})",
            template.title,
            subject_id,
            workout.id
        );
        Ok(workout)
    }

    /// A session with no template; any block label is accepted
    pub fn start_ad_hoc_session(
        &self,
        subject_id: SubjectId,
        date: Option<NaiveDate>,
    ) -> Result<WorkoutResult> {
        let workout = WorkoutResult::new(
            subject_id,
            None,
            date.unwrap_or_else(|| self.clock.today()),
            self.clock.now(),
        );
        self.repo.save_workout(&workout)?;
        tracing::info!(
            "Started ad-hoc session for subject {} ({})",
            subject_id,
            workout.id
        );
        Ok(workout)
    }

    pub fn record_set(&self, result_id: WorkoutResultId, entry: SetEntry) -> Result<SetResult> {
        hold!(self.locks, result_id);

        let workout = self.repo.get_workout(result_id)?;
        if workout.is_finalized() {
            return Err(Error::InvalidState(format!(
                "workout {} is finalized; new sets are rejected",
                result_id
            )));
        }
        let template = self.template_of(&workout)?;
        let mut set = self.resolve_set(template.as_ref(), entry)?;
        set.completed_at = Some(self.clock.now());

        self.repo.update_workout(result_id, &mut |w| w.insert_set(set.clone()))?;
        tracing::debug!(
            "Recorded set {} ({} {} #{}) in workout {}",
            set.id,
            set.result_type,
            set.block_label,
            set.sequence_number(),
            result_id
        );
        Ok(set)
    }

    pub fn record_block_result(
        &self,
        result_id: WorkoutResultId,
        entry: BlockEntry,
    ) -> Result<BlockResult> {
        hold!(self.locks, result_id);

        let workout = self.repo.get_workout(result_id)?;
        let template = self.template_of(&workout)?;

        if let Some(rpe) = entry.average_rpe {
            if !(1.0..=10.0).contains(&rpe) {
                return Err(Error::Validation(format!(
                    "block average rpe {} outside 1..=10",
                    rpe
                )));
            }
        }

        let mut block = match entry.planned_block_id {
            Some(block_id) => {
                let template = template
                    .as_ref()
                    .ok_or_else(|| Error::not_found("session template for workout", result_id))?;
                let planned = template
                    .find_block(block_id)
                    .ok_or_else(|| Error::not_found("exercise block", block_id))?;
                if let Some(block_type) = entry.block_type {
                    if block_type != planned.block_type {
                        return Err(Error::Validation(format!(
                            "block '{}' is planned as {:?}, not {:?}",
                            planned.label, planned.block_type, block_type
                        )));
                    }
                }
                BlockResult::from_plan(planned, entry.metrics)
            }
            None => {
                let label = entry
                    .block_label
                    .filter(|l| !l.trim().is_empty())
                    .ok_or_else(|| Error::Validation("ad-hoc block result needs a label".into()))?;
                let block_type = entry.block_type.ok_or_else(|| {
                    Error::Validation("ad-hoc block result needs a block type".into())
                })?;
                ensure_label(template.as_ref(), &label, "block result")?;
                BlockResult::new(label, entry.block_order.unwrap_or(1), block_type, entry.metrics)
            }
        };
        if entry.target_rounds.is_some() {
            block.target_rounds = entry.target_rounds;
        }
        block.total_time_seconds = entry.total_time_seconds;
        block.work_time_seconds = entry.work_time_seconds;
        block.rest_time_seconds = entry.rest_time_seconds;
        block.average_rpe = entry.average_rpe;
        block.notes = entry.notes;
        block.modifications = entry.modifications;

        let updated = self
            .repo
            .update_workout(result_id, &mut |w| w.insert_block_result(block.clone()))?;
        let stored = updated
            .block_results()
            .iter()
            .find(|b| b.id == block.id)
            .cloned()
            .ok_or_else(|| Error::not_found("block result", block.id))?;
        tracing::debug!(
            "Recorded {} block result '{}' ({}) in workout {}",
            stored.block_type,
            stored.block_label,
            stored.performance_rating(),
            result_id
        );
        Ok(stored)
    }

    /// Stamp the end, re-derive aggregates and detect personal records.
    ///
    /// Calling this on a finished result re-runs the derivation and keeps
    /// the original `ended_at`.
    pub fn finish_session(&self, result_id: WorkoutResultId) -> Result<WorkoutResult> {
        hold!(self.locks, result_id);

        let workout = self.repo.get_workout(result_id)?;
        let template = self.template_of(&workout)?;
        let history = self.history_for(&workout)?;
        let now = self.clock.now();

        let finished = self.repo.update_workout(result_id, &mut |w| {
            check_labels(template.as_ref(), w)?;
            w.mark_finished(now);
            w.recompute()?;
            let history: Vec<&WorkoutResult> = history.iter().collect();
            let records = metrics::detect_personal_records(w, &history);
            w.set_personal_records(records);
            Ok(())
        })?;

        let agg = finished.aggregates();
        tracing::info!(
            "Finished workout {}: {} sets, {} reps, volume {:.1}, avg RPE {:.2}, {} PRs",
            result_id,
            finished.set_results().len(),
            agg.total_reps,
            agg.total_volume_load,
            agg.average_rpe,
            finished.personal_records().len()
        );
        Ok(finished)
    }

    /// Corrective edit of a stored set; allowed after finishing
    pub fn correct_set<F>(
        &self,
        result_id: WorkoutResultId,
        set_id: SetResultId,
        f: F,
    ) -> Result<WorkoutResult>
    where
        F: FnOnce(&mut SetResult),
    {
        hold!(self.locks, result_id);

        let workout = self.repo.get_workout(result_id)?;
        let template = self.template_of(&workout)?;
        let history = self.history_for(&workout)?;
        let mut f = Some(f);

        let updated = self.repo.update_workout(result_id, &mut |w| {
            let edit = f
                .take()
                .ok_or_else(|| Error::InvalidState("correction already applied".into()))?;
            let corrected = w.correct_set(set_id, edit)?;
            ensure_label(template.as_ref(), &corrected.block_label, "set result")?;
            refresh_records(w, &history);
            Ok(())
        })?;
        tracing::info!("Corrected set {} in workout {}", set_id, result_id);
        Ok(updated)
    }

    pub fn delete_set(&self, result_id: WorkoutResultId, set_id: SetResultId) -> Result<WorkoutResult> {
        hold!(self.locks, result_id);

        let workout = self.repo.get_workout(result_id)?;
        let history = self.history_for(&workout)?;
        let updated = self.repo.update_workout(result_id, &mut |w| {
            w.remove_set(set_id)?;
            refresh_records(w, &history);
            Ok(())
        })?;
        tracing::info!("Deleted set {} from workout {}", set_id, result_id);
        Ok(updated)
    }

    pub fn set_completion_status(
        &self,
        result_id: WorkoutResultId,
        status: CompletionStatus,
    ) -> Result<WorkoutResult> {
        hold!(self.locks, result_id);
        self.repo.update_workout(result_id, &mut |w| {
            w.completion_status = Some(status);
            Ok(())
        })
    }

    /// Literal WOD score such as `"21+5"` or `"12:34"`
    pub fn set_wod_result(
        &self,
        result_id: WorkoutResultId,
        wod_result: Option<String>,
        total_rounds: Option<u32>,
        rx_completed: Option<bool>,
    ) -> Result<WorkoutResult> {
        hold!(self.locks, result_id);
        self.repo.update_workout(result_id, &mut |w| {
            w.wod_result = wod_result.clone();
            if total_rounds.is_some() {
                w.total_rounds = total_rounds;
            }
            if rx_completed.is_some() {
                w.rx_completed = rx_completed;
            }
            Ok(())
        })
    }

    /// Device readings, stored as given
    pub fn record_vitals(
        &self,
        result_id: WorkoutResultId,
        calories_burned: Option<u32>,
        average_heart_rate: Option<u32>,
        max_heart_rate: Option<u32>,
    ) -> Result<WorkoutResult> {
        hold!(self.locks, result_id);
        self.repo.update_workout(result_id, &mut |w| {
            w.calories_burned = calories_burned.or(w.calories_burned);
            w.average_heart_rate = average_heart_rate.or(w.average_heart_rate);
            w.max_heart_rate = max_heart_rate.or(w.max_heart_rate);
            Ok(())
        })
    }

    /// Removes the result with its block and set results
    pub fn delete_session(&self, result_id: WorkoutResultId) -> Result<()> {
        {
            hold!(self.locks, result_id);
            if !self.repo.delete_workout(result_id)? {
                return Err(Error::not_found("workout result", result_id));
            }
        }
        self.locks.forget(result_id);
        tracing::info!("Deleted workout {}", result_id);
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn find_by_id(&self, result_id: WorkoutResultId) -> Result<WorkoutResult> {
        self.repo.get_workout(result_id)
    }

    pub fn find_by_subject(&self, subject_id: SubjectId) -> Result<Vec<WorkoutResult>> {
        self.repo.find_workouts(&WorkoutFilter::subject(subject_id))
    }

    pub fn find_by_subject_and_range(
        &self,
        subject_id: SubjectId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WorkoutResult>> {
        if end < start {
            return Err(Error::Validation(format!(
                "range end {} is before start {}",
                end, start
            )));
        }
        self.repo
            .find_workouts(&WorkoutFilter::subject(subject_id).between(start, end))
    }

    pub fn find_by_template(&self, template_id: SessionTemplateId) -> Result<Vec<WorkoutResult>> {
        self.repo.find_workouts(&WorkoutFilter::template(template_id))
    }

    pub fn find_by_planned_item(&self, item_id: BlockItemId) -> Result<Vec<WorkoutResult>> {
        self.repo.find_workouts_for_item(item_id)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// The session's template, or `None` for ad-hoc sessions and templates
    /// deleted since the session started
    fn template_of(&self, workout: &WorkoutResult) -> Result<Option<SessionTemplate>> {
        let Some(template_id) = workout.template_id else {
            return Ok(None);
        };
        match self.repo.find_session_template(template_id)? {
            Some((_, template)) => Ok(Some(template)),
            None => {
                tracing::warn!(
                    "Template {} of workout {} no longer exists; skipping label checks",
                    template_id,
                    workout.id
                );
                Ok(None)
            }
        }
    }

    /// The subject's other finished sessions up to and including this date
    fn history_for(&self, workout: &WorkoutResult) -> Result<Vec<WorkoutResult>> {
        let mut filter = WorkoutFilter::subject(workout.subject_id);
        filter.end = Some(workout.date);
        Ok(self
            .repo
            .find_workouts(&filter)?
            .into_iter()
            .filter(|w| w.id != workout.id && w.is_finalized())
            .collect())
    }

    fn resolve_set(
        &self,
        template: Option<&SessionTemplate>,
        mut entry: SetEntry,
    ) -> Result<SetResult> {
        match entry.planned_item_id {
            Some(item_id) => {
                let template = template
                    .ok_or_else(|| Error::not_found("session template for planned item", item_id))?;
                let (block, item) = template
                    .find_item(item_id)
                    .ok_or_else(|| Error::not_found("block item", item_id))?;

                let expected = item.prescription.set_type().result_type();
                if let Some(given) = entry.result_type {
                    if given != expected {
                        return Err(Error::Validation(format!(
                            "item {} is prescribed as {:?}; result type {:?} conflicts",
                            item_id,
                            item.prescription.set_type(),
                            given
                        )));
                    }
                }
                if entry.exercise_id.is_some_and(|e| e != item.exercise_id) {
                    return Err(Error::Validation(format!(
                        "item {} prescribes exercise {}, not the one given",
                        item_id, item.exercise_id
                    )));
                }
                if entry.block_label.as_deref().is_some_and(|l| l != block.label) {
                    return Err(Error::Validation(format!(
                        "item {} belongs to block '{}'",
                        item_id, block.label
                    )));
                }
                if entry.target_reps.is_none() {
                    entry.target_reps = item.prescription.planned_reps();
                }
                Ok(entry.into_set(item.exercise_id, block.label.clone(), item.order_index, expected))
            }
            None => {
                let exercise_id = entry
                    .exercise_id
                    .ok_or_else(|| Error::Validation("ad-hoc set needs an exercise".into()))?;
                self.repo.get_exercise(exercise_id)?;
                let label = entry
                    .block_label
                    .take()
                    .filter(|l| !l.trim().is_empty())
                    .ok_or_else(|| Error::Validation("ad-hoc set needs a block label".into()))?;
                ensure_label(template, &label, "set result")?;
                let order = entry.block_item_order.unwrap_or(1);
                let result_type = entry.result_type.unwrap_or_default();
                Ok(entry.into_set(exercise_id, label, order, result_type))
            }
        }
    }
}

fn ensure_label(template: Option<&SessionTemplate>, label: &str, what: &str) -> Result<()> {
    match template {
        Some(t) if !t.has_label(label) => Err(Error::InvalidState(format!(
            "{} references block label '{}' absent from session '{}'",
            what, label, t.title
        ))),
        _ => Ok(()),
    }
}

fn check_labels(template: Option<&SessionTemplate>, workout: &WorkoutResult) -> Result<()> {
    let Some(template) = template else {
        return Ok(());
    };
    for set in workout.set_results() {
        if !template.has_label(&set.block_label) {
            return Err(Error::InvalidState(format!(
                "workout {} set {} references block label '{}' absent from session '{}'",
                workout.id, set.id, set.block_label, template.title
            )));
        }
    }
    for block in workout.block_results() {
        if !template.has_label(&block.block_label) {
            return Err(Error::InvalidState(format!(
                "workout {} block result {} references block label '{}' absent from session '{}'",
                workout.id, block.id, block.block_label, template.title
            )));
        }
    }
    Ok(())
}

fn refresh_records(workout: &mut WorkoutResult, history: &[WorkoutResult]) {
    if workout.is_finalized() {
        let history: Vec<&WorkoutResult> = history.iter().collect();
        let records = metrics::detect_personal_records(workout, &history);
        workout.set_personal_records(records);
    }
}
