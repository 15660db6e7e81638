//! Derivation engine: pure functions from raw records to metrics.
//!
//! Missing optional data degrades to 0 or unset. Structurally impossible
//! input (a zero target used as a divisor, metrics that do not match the
//! block's methodology) is an [`Error::InvalidState`].

use crate::results::{BlockMetrics, BlockResult, SetResult, WorkoutResult};
use crate::{BlockType, Error, ExerciseId, Result, ResultType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Derived Products
// ============================================================================

/// Cached per-session aggregates, only ever produced by [`session_aggregates`]
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionAggregates {
    pub total_reps: u32,
    pub total_volume_load: f64,
    /// 0 when no set carries an RPE
    pub average_rpe: f64,
    pub rpe_sample_count: u32,
    pub work_time_seconds: u32,
    pub max_weight_lifted: Option<f64>,
    pub estimated_one_rep_max: Option<f64>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoundTimes {
    pub average_seconds: f64,
    pub fastest_seconds: u32,
    pub slowest_seconds: u32,
}

/// Derived, non-authoritative completion of a block result
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BlockCompletion {
    pub completion_percentage: Option<f64>,
    /// `None` means unknown, not failed
    pub completed_as_planned: Option<bool>,
    pub round_times: Option<RoundTimes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersonalRecord {
    pub exercise_id: ExerciseId,
    pub estimated_one_rep_max: f64,
    pub previous_best: f64,
}

// ============================================================================
// Session Aggregates
// ============================================================================

pub fn session_aggregates(sets: &[SetResult]) -> SessionAggregates {
    let mut agg = SessionAggregates::default();
    let mut rpe_sum = 0.0;

    for set in sets {
        agg.total_reps += set.performed_reps.unwrap_or(0);
        agg.total_volume_load += set.volume_load().unwrap_or(0.0);
        agg.work_time_seconds += set.work_time_seconds.unwrap_or(0);

        if let Some(rpe) = set.rpe {
            rpe_sum += rpe;
            agg.rpe_sample_count += 1;
        }

        if set.result_type == ResultType::StraightSet {
            if let Some(weight) = set.weight {
                agg.max_weight_lifted = Some(agg.max_weight_lifted.map_or(weight, |m| m.max(weight)));
            }
        }
        if let Some(estimate) = set.estimated_one_rep_max() {
            agg.estimated_one_rep_max =
                Some(agg.estimated_one_rep_max.map_or(estimate, |m| m.max(estimate)));
        }
    }

    if agg.rpe_sample_count > 0 {
        agg.average_rpe = rpe_sum / f64::from(agg.rpe_sample_count);
    }
    agg
}

// ============================================================================
// One-Rep Max
// ============================================================================

/// Epley: `weight × (1 + reps / 30)`
pub fn epley(weight: f64, reps: u32) -> f64 {
    weight * (1.0 + f64::from(reps) / 30.0)
}

/// Best Epley estimate per exercise over qualifying straight sets
pub fn best_one_rep_max_by_exercise<'a, I>(sets: I) -> BTreeMap<ExerciseId, f64>
where
    I: IntoIterator<Item = &'a SetResult>,
{
    let mut best = BTreeMap::new();
    for set in sets {
        if let Some(estimate) = set.estimated_one_rep_max() {
            best.entry(set.exercise_id)
                .and_modify(|b: &mut f64| *b = b.max(estimate))
                .or_insert(estimate);
        }
    }
    best
}

/// Exercises in `current` whose best estimate strictly beats the best in
/// `history`. Exercises with no history are not records.
pub fn detect_personal_records(
    current: &WorkoutResult,
    history: &[&WorkoutResult],
) -> Vec<PersonalRecord> {
    let session_best = best_one_rep_max_by_exercise(current.set_results());
    if session_best.is_empty() {
        return Vec::new();
    }
    let prior_best =
        best_one_rep_max_by_exercise(history.iter().flat_map(|w| w.set_results().iter()));

    session_best
        .into_iter()
        .filter_map(|(exercise_id, estimate)| {
            let previous = *prior_best.get(&exercise_id)?;
            (estimate > previous).then_some(PersonalRecord {
                exercise_id,
                estimated_one_rep_max: estimate,
                previous_best: previous,
            })
        })
        .collect()
}

// ============================================================================
// Block Completion
// ============================================================================

/// How a block type's completion is measured
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionRule {
    /// Minutes completed against a minute target
    MinuteTarget,
    /// Rounds completed against the planned rounds
    RoundTarget,
    /// Round target plus per-round timing
    RoundTargetTimed,
    /// No target semantics
    Generic,
}

impl CompletionRule {
    pub fn for_block_type(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Emom => CompletionRule::MinuteTarget,
            BlockType::Tabata => CompletionRule::RoundTarget,
            BlockType::Circuit | BlockType::Superset | BlockType::Triset | BlockType::GiantSet => {
                CompletionRule::RoundTargetTimed
            }
            BlockType::StraightSets
            | BlockType::Amrap
            | BlockType::ForTime
            | BlockType::Complex
            | BlockType::Ladder
            | BlockType::Pyramid
            | BlockType::Wave
            | BlockType::Cluster
            | BlockType::RestPause
            | BlockType::DropSet
            | BlockType::MechanicalDropSet
            | BlockType::DeathBy
            | BlockType::Custom => CompletionRule::Generic,
        }
    }
}

pub fn derive_block_completion(block: &BlockResult) -> Result<BlockCompletion> {
    let rule = CompletionRule::for_block_type(block.block_type);

    match (rule, &block.metrics) {
        (
            CompletionRule::MinuteTarget,
            BlockMetrics::Emom {
                minutes_completed,
                minutes_target,
                failed_minutes,
            },
        ) => {
            if *minutes_target == 0 {
                return Err(zero_target(block, "minutes_target"));
            }
            Ok(BlockCompletion {
                completion_percentage: Some(ratio(*minutes_completed, *minutes_target)),
                completed_as_planned: Some(*failed_minutes == 0),
                round_times: None,
            })
        }
        (CompletionRule::RoundTarget, BlockMetrics::Tabata { rounds_completed, .. }) => {
            round_target(block, *rounds_completed, None)
        }
        (
            CompletionRule::RoundTargetTimed,
            BlockMetrics::Circuit {
                rounds_completed,
                round_times_seconds,
            }
            | BlockMetrics::Superset {
                rounds_completed,
                round_times_seconds,
                ..
            },
        ) => round_target(block, *rounds_completed, round_time_stats(round_times_seconds)),
        (CompletionRule::Generic, _) => Ok(BlockCompletion::default()),
        (rule, metrics) => Err(Error::InvalidState(format!(
            "block result {} of type {:?} ({:?}) carries {} metrics",
            block.id,
            block.block_type,
            rule,
            metrics.kind()
        ))),
    }
}

fn round_target(
    block: &BlockResult,
    rounds_completed: u32,
    round_times: Option<RoundTimes>,
) -> Result<BlockCompletion> {
    match block.target_rounds {
        Some(0) => Err(zero_target(block, "target_rounds")),
        Some(target) => Ok(BlockCompletion {
            completion_percentage: Some(ratio(rounds_completed, target)),
            completed_as_planned: Some(rounds_completed == target),
            round_times,
        }),
        None => Ok(BlockCompletion {
            completion_percentage: None,
            completed_as_planned: None,
            round_times,
        }),
    }
}

pub fn round_time_stats(times: &[u32]) -> Option<RoundTimes> {
    let fastest = *times.iter().min()?;
    let slowest = *times.iter().max()?;
    let total: u64 = times.iter().map(|t| u64::from(*t)).sum();
    Some(RoundTimes {
        average_seconds: total as f64 / times.len() as f64,
        fastest_seconds: fastest,
        slowest_seconds: slowest,
    })
}

fn ratio(completed: u32, target: u32) -> f64 {
    f64::from(completed) / f64::from(target) * 100.0
}

fn zero_target(block: &BlockResult, field: &str) -> Error {
    Error::InvalidState(format!(
        "block result {} of type {:?} has a zero {}",
        block.id, block.block_type, field
    ))
}

// ============================================================================
// Descriptive Statistics
// ============================================================================

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// `stddev / mean × 100`, 0 when the mean is 0
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m == 0.0 {
        return Some(0.0);
    }
    Some(std_dev(values)? / m * 100.0)
}
