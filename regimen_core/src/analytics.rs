//! Range analytics and per-methodology text reports.
//!
//! Everything here reads; nothing is written back. A session still being
//! recorded may or may not be part of a range snapshot.

use crate::metrics::{self, SessionAggregates};
use crate::results::{self, BlockMetrics, BlockResult, WorkoutResult};
use crate::store::{Repository, WorkoutFilter};
use crate::{
    BlockType, Error, ExerciseId, Result, ResultType, SessionTemplateId, SubjectId,
    WorkoutResultId,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Report Types
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct EmomSummary {
    pub average_completion_rate: f64,
    pub total_minutes_completed: u32,
    pub total_minutes_attempted: u32,
    pub minutes_completed_history: Vec<u32>,
    pub best_completion_rate: f64,
    pub best_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct TabataSummary {
    pub average_reps_per_round: f64,
    pub total_rounds_completed: u32,
    pub reps_history: Vec<f64>,
    pub best_average_reps: f64,
    pub best_date: Option<NaiveDate>,
}

/// Literal WOD scores grouped by session title
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct AmrapSummary {
    pub average_rounds: Option<f64>,
    pub wod_results: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct CircuitSummary {
    pub average_round_time: Option<f64>,
    pub total_rounds_completed: u32,
    pub round_time_history: Vec<f64>,
    pub fastest_round_time: Option<u32>,
    pub fastest_round_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct StrengthSummary {
    pub exercise_id: ExerciseId,
    pub max_weight: f64,
    pub max_weight_date: Option<NaiveDate>,
    pub estimated_one_rep_max: f64,
    pub total_volume_load: f64,
    pub weight_history: Vec<f64>,
}

/// One value per session, index-aligned with `session_ids`
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct PerformanceTrends {
    pub session_ids: Vec<WorkoutResultId>,
    pub dates: Vec<NaiveDate>,
    pub volume_load: Vec<f64>,
    pub average_rpe: Vec<f64>,
    pub session_duration: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AnalyticsReport {
    pub subject_id: SubjectId,
    pub start: NaiveDate,
    pub end: NaiveDate,

    pub total_workouts: u32,
    pub average_session_duration_seconds: f64,
    pub total_volume_load: f64,
    pub average_rpe: f64,
    pub personal_records: u32,

    pub emom: Option<EmomSummary>,
    pub tabata: Option<TabataSummary>,
    pub amrap: Option<AmrapSummary>,
    pub circuit: Option<CircuitSummary>,
    /// Keyed by exercise name
    pub strength: BTreeMap<String, StrengthSummary>,
    pub one_rep_max_estimates: BTreeMap<String, f64>,

    pub trends: PerformanceTrends,
    /// Sessions per week over the inclusive range
    pub workout_frequency: f64,
    /// `100 - CV(average RPE)`; unset when no session has an RPE
    pub performance_consistency: Option<f64>,
    /// Percentage of block results completed as planned, per block type
    pub block_type_success: BTreeMap<BlockType, f64>,
}

// ============================================================================
// Service
// ============================================================================

pub struct AnalyticsService {
    repo: Arc<dyn Repository>,
}

impl AnalyticsService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub fn generate_analytics(
        &self,
        subject_id: SubjectId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AnalyticsReport> {
        let workouts = self.workouts_in_range(subject_id, start, end)?;
        let exercise_names = self.exercise_names()?;
        let titles = self.template_titles(&workouts)?;

        let strength = strength_summaries(&workouts, &exercise_names)?;
        let one_rep_max_estimates = strength
            .iter()
            .map(|(name, s)| (name.clone(), s.estimated_one_rep_max))
            .collect();

        let aggregates: Vec<&SessionAggregates> = workouts.iter().map(|w| w.aggregates()).collect();
        let durations: Vec<f64> = workouts
            .iter()
            .filter_map(|w| w.total_duration_seconds.map(f64::from))
            .collect();
        let session_rpes: Vec<f64> = aggregates
            .iter()
            .filter(|a| a.rpe_sample_count > 0)
            .map(|a| a.average_rpe)
            .collect();
        let days = (end - start).num_days() + 1;

        let report = AnalyticsReport {
            subject_id,
            start,
            end,
            total_workouts: u32::try_from(workouts.len()).unwrap_or(u32::MAX),
            average_session_duration_seconds: metrics::mean(&durations).unwrap_or(0.0),
            total_volume_load: aggregates.iter().map(|a| a.total_volume_load).sum(),
            average_rpe: metrics::mean(&session_rpes).unwrap_or(0.0),
            personal_records: workouts
                .iter()
                .map(|w| u32::try_from(w.personal_records().len()).unwrap_or(u32::MAX))
                .sum(),
            emom: emom_summary(&workouts),
            tabata: tabata_summary(&workouts),
            amrap: amrap_summary(&workouts, &titles),
            circuit: circuit_summary(&workouts),
            strength,
            one_rep_max_estimates,
            trends: trends(&workouts),
            workout_frequency: workouts.len() as f64 / days as f64 * 7.0,
            performance_consistency: metrics::coefficient_of_variation(&session_rpes)
                .map(|cv| 100.0 - cv),
            block_type_success: block_type_success(&workouts),
        };

        tracing::info!(
            "Generated analytics for subject {} over {}..={}: {} workouts",
            subject_id,
            start,
            end,
            report.total_workouts
        );
        Ok(report)
    }

    pub fn generate_methodology_report(
        &self,
        subject_id: SubjectId,
        block_type: BlockType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<String> {
        let workouts = self.workouts_in_range(subject_id, start, end)?;
        let blocks: Vec<&BlockResult> = workouts
            .iter()
            .flat_map(|w| w.block_results())
            .filter(|b| b.block_type == block_type)
            .collect();

        if blocks.is_empty() {
            return Ok(format!(
                "No {} workouts found in the specified date range.",
                block_type.display_name()
            ));
        }

        let mut report = format!("=== {} Performance Report ===\n\n", block_type.display_name());
        let written = match block_type {
            BlockType::Emom => emom_section(&mut report, &blocks),
            BlockType::Tabata => tabata_section(&mut report, &blocks),
            BlockType::Circuit => circuit_section(&mut report, &blocks),
            BlockType::Superset => superset_section(&mut report, &blocks),
            _ => generic_section(&mut report, &blocks),
        };
        written.map_err(|_| {
            Error::InvalidState(format!(
                "failed to render the {} report",
                block_type.display_name()
            ))
        })?;
        Ok(report)
    }

    fn workouts_in_range(
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
        let mut workouts = self
            .repo
            .find_workouts(&WorkoutFilter::subject(subject_id).between(start, end))?;
        workouts.sort_by(results::chronological);
        Ok(workouts)
    }

    fn exercise_names(&self) -> Result<HashMap<ExerciseId, String>> {
        Ok(self
            .repo
            .list_exercises()?
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect())
    }

    fn template_titles(
        &self,
        workouts: &[WorkoutResult],
    ) -> Result<HashMap<SessionTemplateId, String>> {
        let mut titles = HashMap::new();
        for template_id in workouts.iter().filter_map(|w| w.template_id) {
            if titles.contains_key(&template_id) {
                continue;
            }
            match self.repo.find_session_template(template_id)? {
                Some((_, template)) => {
                    titles.insert(template_id, template.title);
                }
                None => tracing::warn!(
                    "Template {} referenced by results no longer exists; excluded from WOD grouping",
                    template_id
                ),
            }
        }
        Ok(titles)
    }
}

/// Inclusive `days`-long window ending on `end`
pub fn window_ending(end: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let span = i64::from(days.max(1)) - 1;
    (end - Duration::days(span), end)
}

// ============================================================================
// Summaries
// ============================================================================

fn emom_summary(workouts: &[WorkoutResult]) -> Option<EmomSummary> {
    let mut summary = EmomSummary::default();
    let mut rates = Vec::new();
    let mut seen = false;

    for workout in workouts {
        for block in workout.block_results() {
            if let BlockMetrics::Emom {
                minutes_completed,
                minutes_target,
                ..
            } = block.metrics
            {
                seen = true;
                summary.total_minutes_completed += minutes_completed;
                summary.total_minutes_attempted += minutes_target;
                summary.minutes_completed_history.push(minutes_completed);
                if minutes_target > 0 {
                    let rate = f64::from(minutes_completed) / f64::from(minutes_target) * 100.0;
                    if summary.best_date.is_none() || rate > summary.best_completion_rate {
                        summary.best_completion_rate = rate;
                        summary.best_date = Some(workout.date);
                    }
                    rates.push(rate);
                }
            }
        }
    }
    summary.average_completion_rate = metrics::mean(&rates).unwrap_or(0.0);
    seen.then_some(summary)
}

fn tabata_summary(workouts: &[WorkoutResult]) -> Option<TabataSummary> {
    let mut summary = TabataSummary::default();
    let mut seen = false;

    for workout in workouts {
        for block in workout.block_results() {
            if let BlockMetrics::Tabata {
                rounds_completed,
                average_reps,
            } = block.metrics
            {
                seen = true;
                summary.total_rounds_completed += rounds_completed;
                summary.reps_history.push(average_reps);
                if summary.best_date.is_none() || average_reps > summary.best_average_reps {
                    summary.best_average_reps = average_reps;
                    summary.best_date = Some(workout.date);
                }
            }
        }
    }
    summary.average_reps_per_round = metrics::mean(&summary.reps_history).unwrap_or(0.0);
    seen.then_some(summary)
}

/// Workouts without a resolvable template title still count toward
/// `average_rounds` but are left out of the grouping
fn amrap_summary(
    workouts: &[WorkoutResult],
    titles: &HashMap<SessionTemplateId, String>,
) -> Option<AmrapSummary> {
    let scored: Vec<&WorkoutResult> = workouts.iter().filter(|w| w.wod_result.is_some()).collect();
    if scored.is_empty() {
        return None;
    }

    let rounds: Vec<f64> = scored
        .iter()
        .filter_map(|w| w.total_rounds.map(f64::from))
        .collect();
    let mut wod_results: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for workout in &scored {
        let title = workout.template_id.and_then(|id| titles.get(&id));
        if let (Some(title), Some(score)) = (title, &workout.wod_result) {
            wod_results.entry(title.clone()).or_default().push(score.clone());
        }
    }
    Some(AmrapSummary {
        average_rounds: metrics::mean(&rounds),
        wod_results,
    })
}

fn circuit_summary(workouts: &[WorkoutResult]) -> Option<CircuitSummary> {
    let mut summary = CircuitSummary::default();
    let mut seen = false;

    for workout in workouts {
        for block in workout
            .block_results()
            .iter()
            .filter(|b| b.block_type == BlockType::Circuit)
        {
            seen = true;
            summary.total_rounds_completed += block.metrics.rounds_completed().unwrap_or(0);
            if let Some(times) = &block.completion().round_times {
                summary.round_time_history.push(times.average_seconds);
                if summary
                    .fastest_round_time
                    .map_or(true, |f| times.fastest_seconds < f)
                {
                    summary.fastest_round_time = Some(times.fastest_seconds);
                    summary.fastest_round_date = Some(workout.date);
                }
            }
        }
    }
    summary.average_round_time = metrics::mean(&summary.round_time_history);
    seen.then_some(summary)
}

/// Straight sets with weight and reps, grouped by exercise name.
///
/// A set naming an exercise missing from the catalog aborts the whole pass.
fn strength_summaries(
    workouts: &[WorkoutResult],
    names: &HashMap<ExerciseId, String>,
) -> Result<BTreeMap<String, StrengthSummary>> {
    let mut by_name: BTreeMap<String, StrengthSummary> = BTreeMap::new();
    let mut history: BTreeMap<String, Vec<(DateTime<Utc>, usize, f64)>> = BTreeMap::new();
    let mut ordinal = 0usize;

    for workout in workouts {
        for set in workout.set_results() {
            let (Some(weight), Some(reps)) = (set.weight, set.performed_reps) else {
                continue;
            };
            if set.result_type != ResultType::StraightSet {
                continue;
            }
            let name = names.get(&set.exercise_id).ok_or_else(|| {
                Error::InvalidState(format!(
                    "workout {} set {} references unknown exercise {}",
                    workout.id, set.id, set.exercise_id
                ))
            })?;

            let summary = by_name.entry(name.clone()).or_insert_with(|| StrengthSummary {
                exercise_id: set.exercise_id,
                max_weight: weight,
                max_weight_date: None,
                estimated_one_rep_max: 0.0,
                total_volume_load: 0.0,
                weight_history: Vec::new(),
            });
            if summary.max_weight_date.is_none() || weight > summary.max_weight {
                summary.max_weight = weight;
                summary.max_weight_date = Some(workout.date);
            }
            if reps > 0 {
                summary.estimated_one_rep_max =
                    summary.estimated_one_rep_max.max(metrics::epley(weight, reps));
            }
            summary.total_volume_load += weight * f64::from(reps);

            // Sets without a timestamp keep their session order
            let at = set.completed_at.unwrap_or(workout.started_at);
            history.entry(name.clone()).or_default().push((at, ordinal, weight));
            ordinal += 1;
        }
    }

    for (name, mut points) in history {
        points.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        if let Some(summary) = by_name.get_mut(&name) {
            summary.weight_history = points.into_iter().map(|(_, _, w)| w).collect();
        }
    }
    Ok(by_name)
}

fn trends(workouts: &[WorkoutResult]) -> PerformanceTrends {
    let mut trends = PerformanceTrends::default();
    for workout in workouts {
        let agg = workout.aggregates();
        trends.session_ids.push(workout.id);
        trends.dates.push(workout.date);
        trends.volume_load.push(agg.total_volume_load);
        trends.average_rpe.push(agg.average_rpe);
        trends
            .session_duration
            .push(f64::from(workout.total_duration_seconds.unwrap_or(0)));
    }
    trends
}

fn block_type_success(workouts: &[WorkoutResult]) -> BTreeMap<BlockType, f64> {
    let mut counts: BTreeMap<BlockType, (u32, u32)> = BTreeMap::new();
    for block in workouts.iter().flat_map(|w| w.block_results()) {
        let entry = counts.entry(block.block_type).or_default();
        entry.0 += 1;
        if block.completion().completed_as_planned == Some(true) {
            entry.1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(block_type, (total, succeeded))| {
            (block_type, f64::from(succeeded) / f64::from(total) * 100.0)
        })
        .collect()
}

// ============================================================================
// Methodology Report Sections
// ============================================================================

fn emom_section(report: &mut impl fmt::Write, blocks: &[&BlockResult]) -> fmt::Result {
    let mut rates = Vec::new();
    let mut total_minutes = 0;
    for block in blocks {
        if let BlockMetrics::Emom {
            minutes_completed,
            minutes_target,
            ..
        } = block.metrics
        {
            total_minutes += minutes_completed;
            if minutes_target > 0 {
                rates.push(f64::from(minutes_completed) / f64::from(minutes_target) * 100.0);
            }
        }
    }
    let rate = metrics::mean(&rates).unwrap_or(0.0);

    writeln!(report, "Total EMOM Sessions: {}", blocks.len())?;
    writeln!(report, "Average Completion Rate: {:.1}%", rate)?;
    writeln!(report, "Total Minutes Completed: {}", total_minutes)?;
    let verdict = if rate >= 90.0 {
        "Excellent - Consider increasing intensity"
    } else if rate >= 80.0 {
        "Good - Solid consistency"
    } else if rate >= 70.0 {
        "Fair - Focus on pacing"
    } else {
        "Needs improvement - Consider reducing load"
    };
    writeln!(report, "Performance: {}", verdict)
}

fn tabata_section(report: &mut impl fmt::Write, blocks: &[&BlockResult]) -> fmt::Result {
    let mut reps = Vec::new();
    let mut total_rounds = 0;
    for block in blocks {
        if let BlockMetrics::Tabata {
            rounds_completed,
            average_reps,
        } = block.metrics
        {
            total_rounds += rounds_completed;
            reps.push(average_reps);
        }
    }
    let average = metrics::mean(&reps).unwrap_or(0.0);
    let intensity = if average >= 15.0 {
        "High"
    } else if average >= 10.0 {
        "Moderate"
    } else {
        "Low"
    };

    writeln!(report, "Total Tabata Sessions: {}", blocks.len())?;
    writeln!(report, "Average Reps per Round: {:.1}", average)?;
    writeln!(report, "Total Rounds Completed: {}", total_rounds)?;
    writeln!(report, "Intensity Level: {}", intensity)
}

fn circuit_section(report: &mut impl fmt::Write, blocks: &[&BlockResult]) -> fmt::Result {
    let times: Vec<f64> = blocks
        .iter()
        .filter_map(|b| b.completion().round_times.as_ref().map(|t| t.average_seconds))
        .collect();
    let total_rounds: u32 = blocks
        .iter()
        .map(|b| b.metrics.rounds_completed().unwrap_or(0))
        .sum();

    writeln!(report, "Total Circuit Sessions: {}", blocks.len())?;
    writeln!(
        report,
        "Average Round Time: {:.1} seconds",
        metrics::mean(&times).unwrap_or(0.0)
    )?;
    writeln!(report, "Total Rounds Completed: {}", total_rounds)
}

fn superset_section(report: &mut impl fmt::Write, blocks: &[&BlockResult]) -> fmt::Result {
    let mut rests = Vec::new();
    let mut total = 0;
    for block in blocks {
        if let BlockMetrics::Superset {
            rounds_completed,
            average_rest_between_supersets,
            ..
        } = &block.metrics
        {
            total += rounds_completed;
            rests.extend(average_rest_between_supersets);
        }
    }

    writeln!(report, "Total Superset Sessions: {}", blocks.len())?;
    writeln!(
        report,
        "Average Rest Between Supersets: {:.1} seconds",
        metrics::mean(&rests).unwrap_or(0.0)
    )?;
    writeln!(report, "Total Supersets Completed: {}", total)
}

fn generic_section(report: &mut impl fmt::Write, blocks: &[&BlockResult]) -> fmt::Result {
    let completions: Vec<f64> = blocks
        .iter()
        .filter_map(|b| b.completion().completion_percentage)
        .collect();

    writeln!(report, "Total Sessions: {}", blocks.len())?;
    writeln!(
        report,
        "Average Completion Rate: {:.1}%",
        metrics::mean(&completions).unwrap_or(0.0)
    )
}

impl fmt::Display for AnalyticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analytics {} to {}", self.start, self.end)?;
        writeln!(f, "  Workouts:          {}", self.total_workouts)?;
        writeln!(
            f,
            "  Avg duration:      {}",
            results::format_for_time(self.average_session_duration_seconds.round() as u32)
        )?;
        writeln!(f, "  Total volume:      {:.1}", self.total_volume_load)?;
        writeln!(f, "  Avg RPE:           {:.2}", self.average_rpe)?;
        writeln!(f, "  Personal records:  {}", self.personal_records)?;
        writeln!(f, "  Sessions/week:     {:.2}", self.workout_frequency)?;
        match self.performance_consistency {
            Some(c) => writeln!(f, "  Consistency:       {:.1}", c)?,
            None => writeln!(f, "  Consistency:       -")?,
        }

        if !self.strength.is_empty() {
            writeln!(f, "Strength")?;
            for (name, s) in &self.strength {
                writeln!(
                    f,
                    "  {:<24} max {:.1}  e1RM {:.1}  volume {:.1}",
                    name, s.max_weight, s.estimated_one_rep_max, s.total_volume_load
                )?;
            }
        }
        if let Some(emom) = &self.emom {
            writeln!(
                f,
                "EMOM: {:.1}% avg completion, {}/{} minutes",
                emom.average_completion_rate, emom.total_minutes_completed, emom.total_minutes_attempted
            )?;
        }
        if let Some(tabata) = &self.tabata {
            writeln!(
                f,
                "Tabata: {:.1} reps/round, {} rounds",
                tabata.average_reps_per_round, tabata.total_rounds_completed
            )?;
        }
        if let Some(circuit) = &self.circuit {
            writeln!(
                f,
                "Circuit: {} rounds, avg round {}",
                circuit.total_rounds_completed,
                circuit
                    .average_round_time
                    .map_or_else(|| "-".to_string(), |t| format!("{:.1}s", t))
            )?;
        }
        if let Some(amrap) = &self.amrap {
            for (wod, scores) in &amrap.wod_results {
                writeln!(f, "WOD {}: {}", wod, scores.join(", "))?;
            }
        }
        for (block_type, rate) in &self.block_type_success {
            writeln!(f, "  {} success: {:.1}%", block_type.display_name(), rate)?;
        }
        Ok(())
    }
}
