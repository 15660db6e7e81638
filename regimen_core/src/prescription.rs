//! Prescriptions: what a block item asks the athlete to do.
//!
//! An item carries exactly one [`Prescription`]. The simple form is the
//! legacy sets x reps contract; the advanced form declares a [`SetType`]
//! and the methodology sub-fields that set type reads. Fields outside the
//! declared set type's subset are ignored by derivation and validation.

use crate::tempo::Tempo;
use crate::{Error, LoadingScheme, Result, SetType, WeightUnit};
use serde::{Deserialize, Serialize};

// ============================================================================
// Targets
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepTarget {
    Exact { reps: u32 },
    Range { min: u32, max: u32 },
}

impl RepTarget {
    /// Upper bound of the target, used as the planned rep count
    pub fn planned(&self) -> u32 {
        match self {
            RepTarget::Exact { reps } => *reps,
            RepTarget::Range { max, .. } => *max,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Load {
    Absolute { weight: f64, unit: WeightUnit },
    PercentOfOneRepMax { percent: f64 },
    Bodyweight,
}

// ============================================================================
// Simple Prescription
// ============================================================================

/// Legacy sets x reps contract, always straight sets
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimplePrescription {
    pub week_start: u32,
    pub week_end: u32,
    pub sets: u32,
    pub target_reps: u32,
    #[serde(default)]
    pub tempo: Option<Tempo>,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub coach_notes: Option<String>,
}

impl SimplePrescription {
    pub fn new(sets: u32, target_reps: u32) -> Self {
        Self {
            week_start: 1,
            week_end: 1,
            sets,
            target_reps,
            tempo: None,
            rest_seconds: None,
            coach_notes: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.week_start > self.week_end {
            return Err(invalid(
                SetType::StraightSets,
                "week_start",
                "must not exceed week_end",
            ));
        }
        if self.sets == 0 {
            return Err(invalid(SetType::StraightSets, "sets", "must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Advanced Prescription
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdvancedPrescription {
    pub week_start: u32,
    pub week_end: u32,
    pub set_type: SetType,
    pub sets: u32,
    pub reps: Option<RepTarget>,
    pub load: Option<Load>,

    // Time
    pub work_time_seconds: Option<u32>,
    pub rest_seconds: Option<u32>,
    pub total_duration_seconds: Option<u32>,
    pub rounds: Option<u32>,
    pub tempo: Option<Tempo>,

    // Intensity
    pub target_rpe: Option<f64>,
    pub reps_in_reserve: Option<u32>,
    pub distance: Option<f64>,
    pub distance_unit: Option<String>,

    // EMOM
    pub emom_interval_minutes: Option<u32>,
    pub emom_target_reps: Option<u32>,

    // Tabata
    pub tabata_rounds: Option<u32>,
    pub tabata_work_seconds: Option<u32>,
    pub tabata_rest_seconds: Option<u32>,

    // Drop sets, reductions are percentages per stage
    pub drop_set_stages: Option<u32>,
    pub drop_set_reductions: Vec<f64>,

    // Cluster / rest-pause
    pub cluster_reps: Option<u32>,
    pub cluster_rest_seconds: Option<u32>,
    pub rest_pause_reps: Option<u32>,
    pub rest_pause_seconds: Option<u32>,

    // Grouped sets
    pub superset_position: Option<u32>,
    pub circuit_position: Option<u32>,
    pub complex_position: Option<u32>,
    pub pyramid_structure: Option<String>,

    // Coaching
    pub loading_scheme: Option<LoadingScheme>,
    pub progression_notes: Option<String>,
    pub regression_notes: Option<String>,
    pub special_instructions: Option<String>,
    pub coach_notes: Option<String>,
    pub technical_cues: Vec<String>,
}

impl AdvancedPrescription {
    pub fn new(set_type: SetType) -> Self {
        Self {
            week_start: 1,
            week_end: 1,
            set_type,
            sets: 1,
            ..Self::default()
        }
    }

    pub fn straight_sets(sets: u32, reps: u32) -> Self {
        Self {
            sets,
            reps: Some(RepTarget::Exact { reps }),
            ..Self::new(SetType::StraightSets)
        }
    }

    pub fn emom(interval_minutes: u32, target_reps: u32, total_minutes: u32) -> Self {
        Self {
            emom_interval_minutes: Some(interval_minutes),
            emom_target_reps: Some(target_reps),
            reps: Some(RepTarget::Exact { reps: target_reps }),
            total_duration_seconds: Some(total_minutes * 60),
            ..Self::new(SetType::Emom)
        }
    }

    pub fn tabata(rounds: u32) -> Self {
        Self {
            tabata_rounds: Some(rounds),
            tabata_work_seconds: Some(20),
            tabata_rest_seconds: Some(10),
            work_time_seconds: Some(20),
            rest_seconds: Some(10),
            total_duration_seconds: Some(rounds * 30),
            ..Self::new(SetType::Tabata)
        }
    }

    pub fn superset(position: u32, sets: u32, reps: u32) -> Self {
        Self {
            superset_position: Some(position),
            sets,
            reps: Some(RepTarget::Exact { reps }),
            ..Self::new(SetType::Superset)
        }
    }

    pub fn drop_set(stages: u32, reductions: Vec<f64>) -> Self {
        Self {
            drop_set_stages: Some(stages),
            drop_set_reductions: reductions,
            ..Self::new(SetType::DropSet)
        }
    }

    pub fn circuit(position: u32, work_seconds: u32, rest_seconds: u32) -> Self {
        Self {
            circuit_position: Some(position),
            work_time_seconds: Some(work_seconds),
            rest_seconds: Some(rest_seconds),
            ..Self::new(SetType::Circuit)
        }
    }

    pub fn with_load(mut self, load: Load) -> Self {
        self.load = Some(load);
        self
    }

    pub fn with_weeks(mut self, week_start: u32, week_end: u32) -> Self {
        self.week_start = week_start;
        self.week_end = week_end;
        self
    }

    /// Check the shared range constraints and those of the declared set type
    pub fn validate(&self) -> Result<()> {
        let set_type = self.set_type;

        if self.week_start > self.week_end {
            return Err(invalid(set_type, "week_start", "must not exceed week_end"));
        }
        if let Some(rpe) = self.target_rpe {
            if !(1.0..=10.0).contains(&rpe) {
                return Err(invalid(set_type, "target_rpe", "must be between 1 and 10"));
            }
        }
        if let Some(RepTarget::Range { min, max }) = self.reps {
            if min > max {
                return Err(invalid(set_type, "reps", "range min must not exceed max"));
            }
        }
        match self.load {
            Some(Load::PercentOfOneRepMax { percent }) if !(percent > 0.0 && percent <= 100.0) => {
                return Err(invalid(set_type, "load", "percent of 1RM must be in (0, 100]"));
            }
            Some(Load::Absolute { weight, .. }) if weight < 0.0 => {
                return Err(invalid(set_type, "load", "weight must not be negative"));
            }
            _ => {}
        }

        match set_type {
            SetType::Emom => {
                require_positive(set_type, "emom_interval_minutes", self.emom_interval_minutes)?;
            }
            SetType::DropSet => {
                let stages =
                    require_positive(set_type, "drop_set_stages", self.drop_set_stages)?;
                if self.drop_set_reductions.len() != stages as usize {
                    return Err(invalid(
                        set_type,
                        "drop_set_reductions",
                        "must list one reduction per stage",
                    ));
                }
                if self
                    .drop_set_reductions
                    .iter()
                    .any(|r| !(*r > 0.0 && *r < 100.0))
                {
                    return Err(invalid(
                        set_type,
                        "drop_set_reductions",
                        "each reduction must be a percentage in (0, 100)",
                    ));
                }
            }
            SetType::MechanicalDropSet => {
                require_positive(set_type, "drop_set_stages", self.drop_set_stages)?;
            }
            SetType::Tabata => {
                require_positive(set_type, "tabata_rounds", self.tabata_rounds)?;
                optional_positive(set_type, "tabata_work_seconds", self.tabata_work_seconds)?;
                optional_positive(set_type, "tabata_rest_seconds", self.tabata_rest_seconds)?;
            }
            SetType::ClusterSet => {
                require_positive(set_type, "cluster_reps", self.cluster_reps)?;
            }
            SetType::RestPause => {
                optional_positive(set_type, "rest_pause_seconds", self.rest_pause_seconds)?;
            }
            SetType::Superset | SetType::Triset | SetType::GiantSet => {
                require_positive(set_type, "superset_position", self.superset_position)?;
            }
            SetType::Circuit => {
                require_positive(set_type, "circuit_position", self.circuit_position)?;
            }
            SetType::Pyramid | SetType::ReversePyramid => {
                if let Some(structure) = &self.pyramid_structure {
                    if parse_pyramid(structure).is_none() {
                        return Err(invalid(
                            set_type,
                            "pyramid_structure",
                            "must be dash-separated positive integers",
                        ));
                    }
                }
            }
            SetType::StraightSets
            | SetType::Amrap
            | SetType::ForTime
            | SetType::Isometric
            | SetType::Complex => {}
        }

        Ok(())
    }
}

/// Parse a pyramid structure like `"12-10-8-6"`
pub fn parse_pyramid(structure: &str) -> Option<Vec<u32>> {
    let steps: Option<Vec<u32>> = structure
        .split('-')
        .map(|step| step.trim().parse::<u32>().ok().filter(|n| *n > 0))
        .collect();
    steps.filter(|s| !s.is_empty())
}

// ============================================================================
// Prescription Union
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prescription {
    Simple(SimplePrescription),
    Advanced(AdvancedPrescription),
}

impl Prescription {
    /// Resolve the legacy/advanced pair once, preferring advanced
    pub fn resolve(
        simple: Option<SimplePrescription>,
        advanced: Option<AdvancedPrescription>,
    ) -> Result<Self> {
        match (simple, advanced) {
            (_, Some(advanced)) => Ok(Prescription::Advanced(advanced)),
            (Some(simple), None) => Ok(Prescription::Simple(simple)),
            (None, None) => Err(Error::Validation(
                "block item requires a prescription".into(),
            )),
        }
    }

    pub fn set_type(&self) -> SetType {
        match self {
            Prescription::Simple(_) => SetType::StraightSets,
            Prescription::Advanced(advanced) => advanced.set_type,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Prescription::Simple(simple) => simple.validate(),
            Prescription::Advanced(advanced) => advanced.validate(),
        }
    }

    pub fn applies_to_week(&self, week: u32) -> bool {
        let (start, end) = match self {
            Prescription::Simple(s) => (s.week_start, s.week_end),
            Prescription::Advanced(a) => (a.week_start, a.week_end),
        };
        (start..=end).contains(&week)
    }

    pub fn planned_sets(&self) -> u32 {
        match self {
            Prescription::Simple(s) => s.sets,
            Prescription::Advanced(a) => a.sets,
        }
    }

    pub fn planned_reps(&self) -> Option<u32> {
        match self {
            Prescription::Simple(s) => Some(s.target_reps),
            Prescription::Advanced(a) => a.reps.map(|r| r.planned()),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Prescription::Simple(s) => format!("{} x {}", s.sets, s.target_reps),
            Prescription::Advanced(a) => {
                let reps = match a.reps {
                    Some(RepTarget::Exact { reps }) => reps.to_string(),
                    Some(RepTarget::Range { min, max }) => format!("{}-{}", min, max),
                    None => "-".into(),
                };
                format!("{:?} {} x {}", a.set_type, a.sets, reps)
            }
        }
    }
}

fn invalid(set_type: SetType, field: &str, reason: &str) -> Error {
    Error::Validation(format!("{:?} prescription: {} {}", set_type, field, reason))
}

fn require_positive(set_type: SetType, field: &str, value: Option<u32>) -> Result<u32> {
    match value {
        Some(v) if v >= 1 => Ok(v),
        _ => Err(invalid(set_type, field, "must be at least 1")),
    }
}

fn optional_positive(set_type: SetType, field: &str, value: Option<u32>) -> Result<()> {
    match value {
        Some(0) => Err(invalid(set_type, field, "must be positive when set")),
        _ => Ok(()),
    }
}
