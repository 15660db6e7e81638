//! What was actually performed.
//!
//! A [`WorkoutResult`] owns its [`BlockResult`]s and [`SetResult`]s. Both
//! collections are private and kept ordered; every mutation goes through a
//! method that re-runs derivation so the cached aggregates can never drift
//! from the raw records.

use crate::metrics::{self, BlockCompletion, PersonalRecord, SessionAggregates};
use crate::program::ExerciseBlock;
use crate::{
    BlockItemId, BlockResultId, BlockType, CompletionStatus, Error, ExerciseBlockId, ExerciseId,
    Result, ResultType, SessionTemplateId, SetResultId, SubjectId, WeightUnit, WorkoutResultId,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ============================================================================
// Set Result
// ============================================================================

/// One executed set, round or interval
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetResult {
    pub id: SetResultId,
    #[serde(default)]
    pub planned_item_id: Option<BlockItemId>,
    pub exercise_id: ExerciseId,

    // Position
    pub block_label: String,
    pub block_item_order: u32,
    pub set_number: u32,
    #[serde(default)]
    pub round_number: Option<u32>,
    #[serde(default)]
    pub interval_number: Option<u32>,
    #[serde(default)]
    pub result_type: ResultType,

    // Performance
    #[serde(default)]
    pub target_reps: Option<u32>,
    #[serde(default)]
    pub performed_reps: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    #[serde(default)]
    pub work_time_seconds: Option<u32>,
    #[serde(default)]
    pub rest_time_seconds: Option<u32>,
    #[serde(default)]
    pub total_time_seconds: Option<u32>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub rpe: Option<f64>,
    #[serde(default)]
    pub rir: Option<u32>,
    #[serde(default)]
    pub heart_rate: Option<u32>,

    // Methodology
    #[serde(default)]
    pub completed_rounds: Option<u32>,
    #[serde(default)]
    pub completed_in_time: Option<bool>,
    #[serde(default)]
    pub seconds_remaining: Option<i32>,
    #[serde(default)]
    pub drop_set_reps: Vec<u32>,
    #[serde(default)]
    pub drop_set_weights: Vec<f64>,
    #[serde(default)]
    pub cluster_number: Option<u32>,
    #[serde(default)]
    pub rest_pause_number: Option<u32>,
    #[serde(default)]
    pub reached_failure: bool,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub missed_reps: Option<u32>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SetResult {
    pub fn new(
        exercise_id: ExerciseId,
        block_label: impl Into<String>,
        block_item_order: u32,
        set_number: u32,
        result_type: ResultType,
    ) -> Self {
        Self {
            id: SetResultId::new(),
            planned_item_id: None,
            exercise_id,
            block_label: block_label.into(),
            block_item_order,
            set_number,
            round_number: None,
            interval_number: None,
            result_type,
            target_reps: None,
            performed_reps: None,
            weight: None,
            weight_unit: WeightUnit::default(),
            work_time_seconds: None,
            rest_time_seconds: None,
            total_time_seconds: None,
            distance: None,
            rpe: None,
            rir: None,
            heart_rate: None,
            completed_rounds: None,
            completed_in_time: None,
            seconds_remaining: None,
            drop_set_reps: Vec::new(),
            drop_set_weights: Vec::new(),
            cluster_number: None,
            rest_pause_number: None,
            reached_failure: false,
            failure_reason: None,
            missed_reps: None,
            completed_at: None,
            notes: None,
        }
    }

    pub fn traditional(
        exercise_id: ExerciseId,
        block_label: impl Into<String>,
        order: u32,
        set_number: u32,
        reps: u32,
        weight: f64,
    ) -> Self {
        let mut set = Self::new(exercise_id, block_label, order, set_number, ResultType::StraightSet);
        set.performed_reps = Some(reps);
        set.weight = Some(weight);
        set
    }

    pub fn tabata_round(
        exercise_id: ExerciseId,
        block_label: impl Into<String>,
        order: u32,
        round: u32,
        reps: u32,
        work_seconds: u32,
        rest_seconds: u32,
    ) -> Self {
        let mut set = Self::new(exercise_id, block_label, order, round, ResultType::Tabata);
        set.performed_reps = Some(reps);
        set.work_time_seconds = Some(work_seconds);
        set.rest_time_seconds = Some(rest_seconds);
        set.interval_number = Some(round);
        set
    }

    pub fn emom_round(
        exercise_id: ExerciseId,
        block_label: impl Into<String>,
        order: u32,
        minute: u32,
        reps: u32,
        seconds_remaining: i32,
    ) -> Self {
        let mut set = Self::new(exercise_id, block_label, order, minute, ResultType::Emom);
        set.performed_reps = Some(reps);
        set.seconds_remaining = Some(seconds_remaining);
        set.interval_number = Some(minute);
        set.completed_in_time = Some(seconds_remaining >= 0);
        set
    }

    pub fn amrap_round(
        exercise_id: ExerciseId,
        block_label: impl Into<String>,
        order: u32,
        round: u32,
        total_rounds: u32,
        total_seconds: u32,
    ) -> Self {
        let mut set = Self::new(exercise_id, block_label, order, round, ResultType::Amrap);
        set.completed_rounds = Some(total_rounds);
        set.total_time_seconds = Some(total_seconds);
        set.round_number = Some(round);
        set
    }

    pub fn drop_set(
        exercise_id: ExerciseId,
        block_label: impl Into<String>,
        order: u32,
        set_number: u32,
        reps_per_drop: Vec<u32>,
        weights_per_drop: Vec<f64>,
    ) -> Self {
        let mut set = Self::new(exercise_id, block_label, order, set_number, ResultType::DropSet);
        set.performed_reps = Some(reps_per_drop.iter().sum());
        set.drop_set_reps = reps_per_drop;
        set.drop_set_weights = weights_per_drop;
        set
    }

    pub fn circuit_exercise(
        exercise_id: ExerciseId,
        block_label: impl Into<String>,
        order: u32,
        round: u32,
        reps: u32,
        work_seconds: u32,
    ) -> Self {
        let mut set = Self::new(exercise_id, block_label, order, round, ResultType::Circuit);
        set.performed_reps = Some(reps);
        set.work_time_seconds = Some(work_seconds);
        set.round_number = Some(round);
        set
    }

    /// Interval/round for round-based methodologies, set number otherwise
    pub fn sequence_number(&self) -> u32 {
        if self.result_type.is_round_based() {
            self.interval_number
                .or(self.round_number)
                .unwrap_or(self.set_number)
        } else {
            self.set_number
        }
    }

    fn position_cmp(&self, other: &SetResult) -> Ordering {
        self.block_label
            .cmp(&other.block_label)
            .then(self.block_item_order.cmp(&other.block_item_order))
            .then(self.sequence_number().cmp(&other.sequence_number()))
    }

    pub fn volume_load(&self) -> Option<f64> {
        match (self.performed_reps, self.weight) {
            (Some(reps), Some(weight)) => Some(f64::from(reps) * weight),
            _ => None,
        }
    }

    /// Epley estimate for a qualifying straight set
    pub fn estimated_one_rep_max(&self) -> Option<f64> {
        if self.result_type != ResultType::StraightSet {
            return None;
        }
        match (self.weight, self.performed_reps) {
            (Some(weight), Some(reps)) if reps > 0 => Some(metrics::epley(weight, reps)),
            _ => None,
        }
    }

    pub fn total_reps_all_drops(&self) -> Option<u32> {
        if self.drop_set_reps.is_empty() {
            None
        } else {
            Some(self.drop_set_reps.iter().sum())
        }
    }

    pub fn average_reps_per_minute(&self) -> Option<f64> {
        match (self.total_time_seconds, self.performed_reps) {
            (Some(total), Some(reps)) if total > 0 => Some(f64::from(reps) * 60.0 / f64::from(total)),
            _ => None,
        }
    }

    /// Field sanity checked before a set is stored
    pub fn validate(&self) -> Result<()> {
        if let Some(rpe) = self.rpe {
            if !(1.0..=10.0).contains(&rpe) {
                return Err(Error::Validation(format!(
                    "set {}: rpe {} outside 1..=10",
                    self.id, rpe
                )));
            }
        }
        if self.weight.is_some_and(|w| w < 0.0) || self.drop_set_weights.iter().any(|w| *w < 0.0) {
            return Err(Error::Validation(format!(
                "set {}: weight must not be negative",
                self.id
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Block Result
// ============================================================================

/// Methodology-specific raw inputs of a block result
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockMetrics {
    Emom {
        minutes_completed: u32,
        minutes_target: u32,
        failed_minutes: u32,
    },
    Tabata {
        rounds_completed: u32,
        average_reps: f64,
    },
    Circuit {
        rounds_completed: u32,
        #[serde(default)]
        round_times_seconds: Vec<u32>,
    },
    Superset {
        rounds_completed: u32,
        #[serde(default)]
        round_times_seconds: Vec<u32>,
        #[serde(default)]
        average_rest_between_exercises: Option<f64>,
        #[serde(default)]
        average_rest_between_supersets: Option<f64>,
    },
    DropSet {
        stages: u32,
        total_reps: u32,
    },
    #[default]
    General,
}

impl BlockMetrics {
    pub fn rounds_completed(&self) -> Option<u32> {
        match self {
            BlockMetrics::Emom {
                minutes_completed, ..
            } => Some(*minutes_completed),
            BlockMetrics::Tabata {
                rounds_completed, ..
            }
            | BlockMetrics::Circuit {
                rounds_completed, ..
            }
            | BlockMetrics::Superset {
                rounds_completed, ..
            } => Some(*rounds_completed),
            BlockMetrics::DropSet { .. } | BlockMetrics::General => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BlockMetrics::Emom { .. } => "emom",
            BlockMetrics::Tabata { .. } => "tabata",
            BlockMetrics::Circuit { .. } => "circuit",
            BlockMetrics::Superset { .. } => "superset",
            BlockMetrics::DropSet { .. } => "drop_set",
            BlockMetrics::General => "general",
        }
    }
}

/// One executed block occurrence
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlockResult {
    pub id: BlockResultId,
    #[serde(default)]
    pub planned_block_id: Option<ExerciseBlockId>,
    pub block_label: String,
    pub block_order: u32,
    pub block_type: BlockType,
    #[serde(default)]
    pub target_rounds: Option<u32>,
    #[serde(default)]
    pub total_time_seconds: Option<u32>,
    #[serde(default)]
    pub work_time_seconds: Option<u32>,
    #[serde(default)]
    pub rest_time_seconds: Option<u32>,
    #[serde(default)]
    pub average_rpe: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub modifications: Option<String>,
    #[serde(default)]
    pub metrics: BlockMetrics,
    #[serde(default)]
    completion: BlockCompletion,
}

impl BlockResult {
    /// An ad-hoc block with no planned counterpart
    pub fn new(
        block_label: impl Into<String>,
        block_order: u32,
        block_type: BlockType,
        metrics: BlockMetrics,
    ) -> Self {
        Self {
            id: BlockResultId::new(),
            planned_block_id: None,
            block_label: block_label.into(),
            block_order,
            block_type,
            target_rounds: None,
            total_time_seconds: None,
            work_time_seconds: None,
            rest_time_seconds: None,
            average_rpe: None,
            notes: None,
            modifications: None,
            metrics,
            completion: BlockCompletion::default(),
        }
    }

    /// Copy label, order, type and target rounds from the planned block
    pub fn from_plan(block: &ExerciseBlock, metrics: BlockMetrics) -> Self {
        let mut result = Self::new(block.label.clone(), block.order_index, block.block_type, metrics);
        result.planned_block_id = Some(block.id);
        result.target_rounds = block.timing.total_rounds;
        result
    }

    pub fn emom(block: &ExerciseBlock, minutes_completed: u32, minutes_target: u32, failed_minutes: u32) -> Self {
        Self::from_plan(
            block,
            BlockMetrics::Emom {
                minutes_completed,
                minutes_target,
                failed_minutes,
            },
        )
    }

    pub fn tabata(block: &ExerciseBlock, rounds_completed: u32, average_reps: f64) -> Self {
        Self::from_plan(
            block,
            BlockMetrics::Tabata {
                rounds_completed,
                average_reps,
            },
        )
    }

    pub fn circuit(block: &ExerciseBlock, rounds_completed: u32, round_times_seconds: Vec<u32>) -> Self {
        Self::from_plan(
            block,
            BlockMetrics::Circuit {
                rounds_completed,
                round_times_seconds,
            },
        )
    }

    pub fn completion(&self) -> &BlockCompletion {
        &self.completion
    }

    /// Re-derive completion. On failure the previous values stay in place.
    pub fn recompute(&mut self) -> Result<()> {
        match metrics::derive_block_completion(self) {
            Ok(completion) => {
                self.completion = completion;
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    block_result_id = %self.id,
                    block_type = ?self.block_type,
                    "Block completion derivation failed: {}",
                    e
                );
                Err(e)
            }
        }
    }

    pub fn performance_rating(&self) -> &'static str {
        match self.completion.completion_percentage {
            Some(p) if p >= 100.0 => "Excellent",
            Some(p) if p >= 90.0 => "Very Good",
            Some(p) if p >= 80.0 => "Good",
            Some(p) if p >= 70.0 => "Fair",
            Some(p) if p >= 60.0 => "Poor",
            Some(_) => "Very Poor",
            None => "Not Rated",
        }
    }

    pub fn was_successful(&self) -> bool {
        self.completion.completed_as_planned == Some(true)
            && self
                .completion
                .completion_percentage
                .is_some_and(|p| p >= 90.0)
    }

    pub fn work_density(&self) -> Option<f64> {
        match (self.total_time_seconds, self.work_time_seconds) {
            (Some(total), Some(work)) if total > 0 => Some(f64::from(work) / f64::from(total) * 100.0),
            _ => None,
        }
    }
}

// ============================================================================
// Workout Result
// ============================================================================

/// One executed workout session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutResult {
    pub id: WorkoutResultId,
    pub subject_id: SubjectId,
    #[serde(default)]
    pub template_id: Option<SessionTemplateId>,
    pub date: NaiveDate,
    #[serde(default)]
    pub week: Option<u32>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_duration_seconds: Option<u32>,
    #[serde(default)]
    pub completion_status: Option<CompletionStatus>,

    // Recorded inputs, not processed
    #[serde(default)]
    pub calories_burned: Option<u32>,
    #[serde(default)]
    pub average_heart_rate: Option<u32>,
    #[serde(default)]
    pub max_heart_rate: Option<u32>,
    #[serde(default)]
    pub wod_result: Option<String>,
    #[serde(default)]
    pub total_rounds: Option<u32>,
    #[serde(default)]
    pub rx_completed: Option<bool>,
    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    aggregates: SessionAggregates,
    #[serde(default)]
    personal_records: Vec<PersonalRecord>,
    #[serde(default)]
    block_results: Vec<BlockResult>,
    #[serde(default)]
    set_results: Vec<SetResult>,
}

impl WorkoutResult {
    pub fn new(
        subject_id: SubjectId,
        template_id: Option<SessionTemplateId>,
        date: NaiveDate,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WorkoutResultId::new(),
            subject_id,
            template_id,
            date,
            week: None,
            started_at,
            ended_at: None,
            total_duration_seconds: None,
            completion_status: None,
            calories_burned: None,
            average_heart_rate: None,
            max_heart_rate: None,
            wod_result: None,
            total_rounds: None,
            rx_completed: None,
            notes: None,
            aggregates: SessionAggregates::default(),
            personal_records: Vec::new(),
            block_results: Vec::new(),
            set_results: Vec::new(),
        }
    }

    /// Whole-workout for-time score, stored as `m:ss`
    pub fn for_time_result(
        subject_id: SubjectId,
        template_id: Option<SessionTemplateId>,
        started_at: DateTime<Utc>,
        total_seconds: u32,
        rx: bool,
    ) -> Self {
        let mut result = Self::new(subject_id, template_id, started_at.date_naive(), started_at);
        result.completion_status = Some(CompletionStatus::Completed);
        result.total_duration_seconds = Some(total_seconds);
        result.ended_at = Some(started_at + Duration::seconds(i64::from(total_seconds)));
        result.wod_result = Some(format_for_time(total_seconds));
        result.rx_completed = Some(rx);
        result
    }

    /// Whole-workout AMRAP score, stored as `rounds+reps`
    pub fn amrap_result(
        subject_id: SubjectId,
        template_id: Option<SessionTemplateId>,
        started_at: DateTime<Utc>,
        rounds: u32,
        additional_reps: u32,
        time_cap_seconds: u32,
    ) -> Self {
        let mut result = Self::new(subject_id, template_id, started_at.date_naive(), started_at);
        result.completion_status = Some(CompletionStatus::Completed);
        result.total_duration_seconds = Some(time_cap_seconds);
        result.ended_at = Some(started_at + Duration::seconds(i64::from(time_cap_seconds)));
        result.total_rounds = Some(rounds);
        result.wod_result = Some(format!("{}+{}", rounds, additional_reps));
        result
    }

    pub fn aggregates(&self) -> &SessionAggregates {
        &self.aggregates
    }

    pub fn personal_records(&self) -> &[PersonalRecord] {
        &self.personal_records
    }

    pub fn block_results(&self) -> &[BlockResult] {
        &self.block_results
    }

    pub fn set_results(&self) -> &[SetResult] {
        &self.set_results
    }

    pub fn find_set(&self, id: SetResultId) -> Option<&SetResult> {
        self.set_results.iter().find(|s| s.id == id)
    }

    pub fn is_finalized(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Re-derive session aggregates and every block completion.
    ///
    /// A block whose derivation fails keeps its previous completion; the
    /// first such failure is returned after all blocks were attempted.
    pub fn recompute(&mut self) -> Result<()> {
        self.aggregates = metrics::session_aggregates(&self.set_results);

        let mut first_error = None;
        for block in &mut self.block_results {
            if let Err(e) = block.recompute() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Insert a set at its ordered position and recompute aggregates
    pub fn insert_set(&mut self, set: SetResult) -> Result<()> {
        if self.is_finalized() {
            return Err(Error::InvalidState(format!(
                "workout {} is finalized; new sets are rejected",
                self.id
            )));
        }
        set.validate()?;
        self.place_set(set)?;
        self.aggregates = metrics::session_aggregates(&self.set_results);
        Ok(())
    }

    /// Corrective edit, allowed after finalization
    pub fn correct_set<F>(&mut self, id: SetResultId, f: F) -> Result<&SetResult>
    where
        F: FnOnce(&mut SetResult),
    {
        let pos = self
            .set_results
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::not_found("set result", id))?;

        let original = self.set_results.remove(pos);
        let mut corrected = original.clone();
        f(&mut corrected);
        corrected.id = original.id;

        let placed = corrected.validate().and_then(|_| self.place_set(corrected));
        if let Err(e) = placed {
            self.set_results.insert(pos, original);
            return Err(e);
        }

        self.aggregates = metrics::session_aggregates(&self.set_results);
        self.find_set(id)
            .ok_or_else(|| Error::not_found("set result", id))
    }

    /// Corrective removal, allowed after finalization
    pub fn remove_set(&mut self, id: SetResultId) -> Result<SetResult> {
        let pos = self
            .set_results
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::not_found("set result", id))?;
        let removed = self.set_results.remove(pos);
        self.aggregates = metrics::session_aggregates(&self.set_results);
        Ok(removed)
    }

    /// Derive completion, then insert ordered by block order and label
    pub fn insert_block_result(&mut self, mut block: BlockResult) -> Result<()> {
        if self.is_finalized() {
            return Err(Error::InvalidState(format!(
                "workout {} is finalized; new block results are rejected",
                self.id
            )));
        }
        if self
            .block_results
            .iter()
            .any(|b| b.block_label == block.block_label)
        {
            return Err(Error::InvalidState(format!(
                "workout {} already has a block result for '{}'",
                self.id, block.block_label
            )));
        }
        block.recompute()?;

        let pos = self.block_results.partition_point(|b| {
            (b.block_order, b.block_label.as_str()) < (block.block_order, block.block_label.as_str())
        });
        self.block_results.insert(pos, block);
        Ok(())
    }

    fn place_set(&mut self, set: SetResult) -> Result<()> {
        match self
            .set_results
            .binary_search_by(|probe| probe.position_cmp(&set))
        {
            Ok(_) => Err(Error::InvalidState(format!(
                "workout {} already has a set at block '{}' item {} sequence {}",
                self.id,
                set.block_label,
                set.block_item_order,
                set.sequence_number()
            ))),
            Err(pos) => {
                self.set_results.insert(pos, set);
                Ok(())
            }
        }
    }

    /// Stamp the end of the session. A second call keeps the first `ended_at`.
    pub(crate) fn mark_finished(&mut self, now: DateTime<Utc>) {
        let ended_at = *self.ended_at.get_or_insert(now);
        let seconds = (ended_at - self.started_at).num_seconds().max(0);
        self.total_duration_seconds = Some(u32::try_from(seconds).unwrap_or(u32::MAX));
    }

    pub(crate) fn set_personal_records(&mut self, records: Vec<PersonalRecord>) {
        self.personal_records = records;
    }

    /// Wall-clock duration, falling back to the recorded total
    pub fn session_duration(&self) -> Duration {
        match self.ended_at {
            Some(end) => end - self.started_at,
            None => Duration::seconds(i64::from(self.total_duration_seconds.unwrap_or(0))),
        }
    }

    /// Work time as a percentage of total duration
    pub fn work_density(&self) -> Option<f64> {
        match self.total_duration_seconds {
            Some(total) if total > 0 => {
                Some(f64::from(self.aggregates.work_time_seconds) / f64::from(total) * 100.0)
            }
            _ => None,
        }
    }

    pub fn volume_load_per_minute(&self) -> Option<f64> {
        match self.total_duration_seconds {
            Some(total) if total > 0 => {
                Some(self.aggregates.total_volume_load * 60.0 / f64::from(total))
            }
            _ => None,
        }
    }
}

pub(crate) fn chronological(a: &WorkoutResult, b: &WorkoutResult) -> Ordering {
    a.date
        .cmp(&b.date)
        .then(a.started_at.cmp(&b.started_at))
        .then(a.id.cmp(&b.id))
}

/// `m:ss`
pub fn format_for_time(total_seconds: u32) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn workout() -> WorkoutResult {
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
        WorkoutResult::new(SubjectId::new(), None, started.date_naive(), started)
    }

    #[test]
    fn test_sets_are_kept_in_position_order() {
        let mut w = workout();
        let squat = ExerciseId::new();
        w.insert_set(SetResult::traditional(squat, "B", 1, 1, 5, 100.0)).unwrap();
        w.insert_set(SetResult::traditional(squat, "A", 2, 1, 5, 100.0)).unwrap();
        w.insert_set(SetResult::traditional(squat, "A", 1, 2, 5, 100.0)).unwrap();
        w.insert_set(SetResult::traditional(squat, "A", 1, 1, 5, 100.0)).unwrap();

        let positions: Vec<(String, u32, u32)> = w
            .set_results()
            .iter()
            .map(|s| (s.block_label.clone(), s.block_item_order, s.set_number))
            .collect();
        assert_eq!(
            positions,
            vec![
                ("A".to_string(), 1, 1),
                ("A".to_string(), 1, 2),
                ("A".to_string(), 2, 1),
                ("B".to_string(), 1, 1),
            ]
        );
    }

    #[test]
    fn test_round_based_sets_sequence_by_interval() {
        let mut w = workout();
        let burpee = ExerciseId::new();
        w.insert_set(SetResult::emom_round(burpee, "E", 1, 2, 10, 15)).unwrap();
        w.insert_set(SetResult::emom_round(burpee, "E", 1, 1, 10, 12)).unwrap();
        assert_eq!(w.set_results()[0].interval_number, Some(1));
        assert_eq!(w.set_results()[1].interval_number, Some(2));
    }

    #[test]
    fn test_duplicate_position_rejected() {
        let mut w = workout();
        let squat = ExerciseId::new();
        w.insert_set(SetResult::traditional(squat, "A", 1, 1, 5, 100.0)).unwrap();
        let err = w
            .insert_set(SetResult::traditional(squat, "A", 1, 1, 3, 110.0))
            .unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(w.set_results().len(), 1);
    }

    #[test]
    fn test_finalized_rejects_new_sets_but_allows_corrections() {
        let mut w = workout();
        let squat = ExerciseId::new();
        let set = SetResult::traditional(squat, "A", 1, 1, 5, 100.0);
        let set_id = set.id;
        w.insert_set(set).unwrap();
        w.mark_finished(w.started_at + Duration::minutes(45));

        let err = w
            .insert_set(SetResult::traditional(squat, "A", 1, 2, 5, 100.0))
            .unwrap_err();
        assert!(err.is_invalid_state());

        w.correct_set(set_id, |s| s.performed_reps = Some(6)).unwrap();
        assert_eq!(w.aggregates().total_reps, 6);
        assert!((w.aggregates().total_volume_load - 600.0).abs() < 1e-9);

        w.remove_set(set_id).unwrap();
        assert_eq!(w.aggregates().total_reps, 0);
    }

    #[test]
    fn test_correction_collision_restores_original() {
        let mut w = workout();
        let squat = ExerciseId::new();
        let first = SetResult::traditional(squat, "A", 1, 1, 5, 100.0);
        let second = SetResult::traditional(squat, "A", 1, 2, 5, 100.0);
        let second_id = second.id;
        w.insert_set(first).unwrap();
        w.insert_set(second).unwrap();

        let err = w.correct_set(second_id, |s| s.set_number = 1).unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(w.set_results().len(), 2);
        assert_eq!(w.find_set(second_id).unwrap().set_number, 2);
    }

    #[test]
    fn test_invalid_rpe_and_weight_rejected() {
        let mut w = workout();
        let mut set = SetResult::traditional(ExerciseId::new(), "A", 1, 1, 5, 100.0);
        set.rpe = Some(11.0);
        assert!(w.insert_set(set).unwrap_err().is_validation());

        let set = SetResult::traditional(ExerciseId::new(), "A", 1, 1, 5, -1.0);
        assert!(w.insert_set(set).unwrap_err().is_validation());
    }

    #[test]
    fn test_mark_finished_keeps_first_end() {
        let mut w = workout();
        let first_end = w.started_at + Duration::minutes(30);
        w.mark_finished(first_end);
        w.mark_finished(first_end + Duration::minutes(10));
        assert_eq!(w.ended_at, Some(first_end));
        assert_eq!(w.total_duration_seconds, Some(1800));
    }

    #[test]
    fn test_wod_constructors() {
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
        let fran = WorkoutResult::for_time_result(SubjectId::new(), None, started, 754, true);
        assert_eq!(fran.wod_result.as_deref(), Some("12:34"));
        assert!(fran.is_finalized());

        let cindy = WorkoutResult::amrap_result(SubjectId::new(), None, started, 21, 5, 1200);
        assert_eq!(cindy.wod_result.as_deref(), Some("21+5"));
        assert_eq!(cindy.total_rounds, Some(21));
        assert_eq!(format_for_time(65), "1:05");
    }

    #[test]
    fn test_performance_rating_thresholds() {
        let block = ExerciseBlock::circuit("C", 10, 30);
        let mut result = BlockResult::circuit(&block, 9, vec![]);
        result.recompute().unwrap();
        assert_eq!(result.performance_rating(), "Very Good");
        assert!(!result.was_successful());

        let mut full = BlockResult::circuit(&block, 10, vec![]);
        full.recompute().unwrap();
        assert_eq!(full.performance_rating(), "Excellent");
        assert!(full.was_successful());

        let general = BlockResult::new("X", 1, BlockType::Wave, BlockMetrics::General);
        assert_eq!(general.performance_rating(), "Not Rated");
    }

    #[test]
    fn test_drop_set_factory_sums_reps() {
        let set = SetResult::drop_set(ExerciseId::new(), "D", 1, 1, vec![8, 6, 4], vec![50.0, 40.0, 30.0]);
        assert_eq!(set.performed_reps, Some(18));
        assert_eq!(set.total_reps_all_drops(), Some(18));
        assert_eq!(set.volume_load(), None);
    }
}
