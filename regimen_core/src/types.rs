//! Shared domain vocabulary for the regimen system.
//!
//! This module defines:
//! - Typed identifiers for every planning and result entity
//! - The closed methodology enumerations (block, set and result types)
//! - Exercise classification (category, movement pattern, complexity,
//!   measurement types) and the exercise record itself

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

typed_id!(
    /// Identifies a training program
    ProgramId
);
typed_id!(
    /// Identifies a session template inside a program
    SessionTemplateId
);
typed_id!(
    /// Identifies an exercise block inside a session template
    ExerciseBlockId
);
typed_id!(
    /// Identifies a block item (exercise + prescription)
    BlockItemId
);
typed_id!(
    /// Identifies a catalog exercise
    ExerciseId
);
typed_id!(
    /// Identifies one executed workout session
    WorkoutResultId
);
typed_id!(
    /// Identifies one executed block occurrence
    BlockResultId
);
typed_id!(
    /// Identifies one executed set, round or interval
    SetResultId
);
typed_id!(
    /// Identifies the person performing workouts
    SubjectId
);

/// Parse a snake_case serde tag, accepting loose spellings like
/// `"Drop-Set"`, `"drop set"` or `"DROP_SET"`.
pub fn parse_tag<T: DeserializeOwned>(input: &str) -> std::result::Result<T, String> {
    let normalized: String = input
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect();

    T::deserialize(serde::de::value::StrDeserializer::<serde::de::value::Error>::new(
        &normalized,
    ))
    .map_err(|_| format!("unknown value '{}'", input))
}

macro_rules! tag_from_str {
    ($($name:ident),* $(,)?) => {
        $(
            impl FromStr for $name {
                type Err = String;

                fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                    parse_tag(s)
                }
            }
        )*
    };
}

// ============================================================================
// Methodology Types
// ============================================================================

/// Structural methodology of an exercise block
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    StraightSets,
    Superset,
    Triset,
    GiantSet,
    Circuit,
    Emom,
    Tabata,
    Amrap,
    ForTime,
    Complex,
    Ladder,
    Pyramid,
    Wave,
    Cluster,
    RestPause,
    DropSet,
    MechanicalDropSet,
    DeathBy,
    Custom,
}

impl BlockType {
    pub const ALL: [BlockType; 19] = [
        BlockType::StraightSets,
        BlockType::Superset,
        BlockType::Triset,
        BlockType::GiantSet,
        BlockType::Circuit,
        BlockType::Emom,
        BlockType::Tabata,
        BlockType::Amrap,
        BlockType::ForTime,
        BlockType::Complex,
        BlockType::Ladder,
        BlockType::Pyramid,
        BlockType::Wave,
        BlockType::Cluster,
        BlockType::RestPause,
        BlockType::DropSet,
        BlockType::MechanicalDropSet,
        BlockType::DeathBy,
        BlockType::Custom,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            BlockType::StraightSets => "Straight Sets",
            BlockType::Superset => "Superset",
            BlockType::Triset => "Triset",
            BlockType::GiantSet => "Giant Set",
            BlockType::Circuit => "Circuit",
            BlockType::Emom => "EMOM",
            BlockType::Tabata => "Tabata",
            BlockType::Amrap => "AMRAP",
            BlockType::ForTime => "For Time",
            BlockType::Complex => "Complex Training",
            BlockType::Ladder => "Ladder",
            BlockType::Pyramid => "Pyramid",
            BlockType::Wave => "Wave Loading",
            BlockType::Cluster => "Cluster Sets",
            BlockType::RestPause => "Rest-Pause",
            BlockType::DropSet => "Drop Set",
            BlockType::MechanicalDropSet => "Mechanical Drop Set",
            BlockType::DeathBy => "Death By",
            BlockType::Custom => "Custom",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Set structure declared by an advanced prescription
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SetType {
    #[default]
    StraightSets,
    Superset,
    Triset,
    GiantSet,
    DropSet,
    RestPause,
    ClusterSet,
    Pyramid,
    ReversePyramid,
    Circuit,
    Emom,
    Tabata,
    Amrap,
    ForTime,
    Isometric,
    Complex,
    MechanicalDropSet,
}

impl SetType {
    pub const ALL: [SetType; 17] = [
        SetType::StraightSets,
        SetType::Superset,
        SetType::Triset,
        SetType::GiantSet,
        SetType::DropSet,
        SetType::RestPause,
        SetType::ClusterSet,
        SetType::Pyramid,
        SetType::ReversePyramid,
        SetType::Circuit,
        SetType::Emom,
        SetType::Tabata,
        SetType::Amrap,
        SetType::ForTime,
        SetType::Isometric,
        SetType::Complex,
        SetType::MechanicalDropSet,
    ];

    /// The result tag a set performed under this prescription carries
    pub fn result_type(self) -> ResultType {
        match self {
            SetType::StraightSets => ResultType::StraightSet,
            SetType::Superset | SetType::Triset | SetType::GiantSet => ResultType::Superset,
            SetType::DropSet | SetType::MechanicalDropSet => ResultType::DropSet,
            SetType::RestPause => ResultType::RestPause,
            SetType::ClusterSet => ResultType::ClusterSet,
            SetType::Pyramid | SetType::ReversePyramid => ResultType::Pyramid,
            SetType::Circuit => ResultType::Circuit,
            SetType::Emom => ResultType::Emom,
            SetType::Tabata => ResultType::Tabata,
            SetType::Amrap => ResultType::Amrap,
            SetType::ForTime => ResultType::ForTime,
            SetType::Isometric => ResultType::Isometric,
            SetType::Complex => ResultType::Complex,
        }
    }
}

/// Kind of record captured for one executed set, round or interval
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    #[default]
    StraightSet,
    Superset,
    Circuit,
    Tabata,
    Emom,
    Amrap,
    ForTime,
    DropSet,
    ClusterSet,
    RestPause,
    Pyramid,
    Complex,
    Isometric,
    Plyometric,
    Cardio,
    TimeTrial,
    MaxEffort,
    DynamicEffort,
    SkillPractice,
    Custom,
}

impl ResultType {
    pub fn display_name(self) -> &'static str {
        match self {
            ResultType::StraightSet => "Traditional Set",
            ResultType::Superset => "Superset",
            ResultType::Circuit => "Circuit",
            ResultType::Tabata => "Tabata Round",
            ResultType::Emom => "EMOM Round",
            ResultType::Amrap => "AMRAP Round",
            ResultType::ForTime => "For Time",
            ResultType::DropSet => "Drop Set",
            ResultType::ClusterSet => "Cluster Set",
            ResultType::RestPause => "Rest-Pause",
            ResultType::Pyramid => "Pyramid Set",
            ResultType::Complex => "Complex Set",
            ResultType::Isometric => "Isometric Hold",
            ResultType::Plyometric => "Plyometric",
            ResultType::Cardio => "Cardio",
            ResultType::TimeTrial => "Time Trial",
            ResultType::MaxEffort => "Max Effort",
            ResultType::DynamicEffort => "Dynamic Effort",
            ResultType::SkillPractice => "Skill Practice",
            ResultType::Custom => "Custom",
        }
    }

    /// Round-based results are sequenced by round/interval, not set number
    pub fn is_round_based(self) -> bool {
        matches!(
            self,
            ResultType::Emom | ResultType::Tabata | ResultType::Amrap | ResultType::Circuit
        )
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Overall outcome of an executed session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    PartiallyCompleted,
    Modified,
    TerminatedEarly,
    Scaled,
    ScaledUp,
    Missed,
}

impl CompletionStatus {
    pub fn description(self) -> &'static str {
        match self {
            CompletionStatus::Completed => "Completed as planned",
            CompletionStatus::PartiallyCompleted => "Partially completed",
            CompletionStatus::Modified => "Completed with modifications",
            CompletionStatus::TerminatedEarly => "Terminated early",
            CompletionStatus::Scaled => "Scaled down",
            CompletionStatus::ScaledUp => "Scaled up",
            CompletionStatus::Missed => "Missed session",
        }
    }
}

/// Unit of an absolute load
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

impl WeightUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lbs => "lbs",
        }
    }
}

/// Periodization scheme attached to a prescription
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoadingScheme {
    Linear,
    ReverseLinear,
    Undulating,
    Block,
    Conjugate,
    PercentageBased,
    RpeBased,
    Autoregulated,
}

// ============================================================================
// Exercise Classification
// ============================================================================

/// Discipline an exercise belongs to
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    #[default]
    Strength,
    Powerlifting,
    OlympicLifting,
    Bodybuilding,
    Functional,
    Crossfit,
    Kettlebell,
    Sandbag,
    Cardio,
    Hiit,
    SteadyState,
    Stretching,
    Mobility,
    Yoga,
    Pilates,
    SportSpecific,
    Agility,
    Plyometric,
    Balance,
    Corrective,
    Prehab,
    PhysicalTherapy,
    Isometric,
    Eccentric,
    Unilateral,
    Compound,
    Isolation,
    MartialArts,
    Boxing,
    Aquatic,
    Bodyweight,
    FreeWeights,
    Machines,
    ResistanceBands,
    Suspension,
    Recovery,
    WarmUp,
    CoolDown,
}

impl ExerciseCategory {
    pub fn display_name(self) -> &'static str {
        match self {
            ExerciseCategory::Strength => "Strength",
            ExerciseCategory::Powerlifting => "Powerlifting",
            ExerciseCategory::OlympicLifting => "Olympic Lifting",
            ExerciseCategory::Bodybuilding => "Bodybuilding",
            ExerciseCategory::Functional => "Functional",
            ExerciseCategory::Crossfit => "CrossFit",
            ExerciseCategory::Kettlebell => "Kettlebell",
            ExerciseCategory::Sandbag => "Sandbag",
            ExerciseCategory::Cardio => "Cardio",
            ExerciseCategory::Hiit => "HIIT",
            ExerciseCategory::SteadyState => "Steady State",
            ExerciseCategory::Stretching => "Stretching",
            ExerciseCategory::Mobility => "Mobility",
            ExerciseCategory::Yoga => "Yoga",
            ExerciseCategory::Pilates => "Pilates",
            ExerciseCategory::SportSpecific => "Sport-Specific",
            ExerciseCategory::Agility => "Agility",
            ExerciseCategory::Plyometric => "Plyometric",
            ExerciseCategory::Balance => "Balance",
            ExerciseCategory::Corrective => "Corrective",
            ExerciseCategory::Prehab => "Prehab",
            ExerciseCategory::PhysicalTherapy => "Physical Therapy",
            ExerciseCategory::Isometric => "Isometric",
            ExerciseCategory::Eccentric => "Eccentric",
            ExerciseCategory::Unilateral => "Unilateral",
            ExerciseCategory::Compound => "Compound",
            ExerciseCategory::Isolation => "Isolation",
            ExerciseCategory::MartialArts => "Martial Arts",
            ExerciseCategory::Boxing => "Boxing",
            ExerciseCategory::Aquatic => "Aquatic",
            ExerciseCategory::Bodyweight => "Bodyweight",
            ExerciseCategory::FreeWeights => "Free Weights",
            ExerciseCategory::Machines => "Machines",
            ExerciseCategory::ResistanceBands => "Resistance Bands",
            ExerciseCategory::Suspension => "Suspension",
            ExerciseCategory::Recovery => "Recovery",
            ExerciseCategory::WarmUp => "Warm-up",
            ExerciseCategory::CoolDown => "Cool-down",
        }
    }
}

/// Fundamental movement pattern
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    Squat,
    Hinge,
    Lunge,
    PushVertical,
    PushHorizontal,
    PullVertical,
    PullHorizontal,
    CoreStability,
    AntiExtension,
    AntiFlexion,
    AntiLateralFlexion,
    AntiRotation,
    Gait,
    Crawling,
    Jumping,
    Landing,
    Rotation,
    Spiral,
    Carry,
    Throwing,
    TurkishGetUp,
    Burpee,
    Hold,
    Stretch,
    Coordination,
    Ballistic,
    Plyometric,
    Isolation,
    Compound,
    Unilateral,
    Bilateral,
}

/// Technical demand of an exercise
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseComplexity {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

/// Quantities that can be tracked for an exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    Weight,
    Bodyweight,
    Percentage1rm,
    Reps,
    MaxReps,
    RepRanges,
    Duration,
    WorkTime,
    RestTime,
    Intervals,
    Pace,
    Distance,
    Height,
    Depth,
    Rounds,
    Sets,
    Rpm,
    HeartRate,
    Cadence,
    ResistanceLevel,
    Incline,
    Speed,
    Power,
    Force,
    Velocity,
    RangeOfMotion,
    HoldTime,
    ContactTime,
    FlightTime,
    FormScore,
    DifficultyScore,
    Rpe,
    Rir,
    Temperature,
    Altitude,
    BandResistance,
    WaterDepth,
    Accuracy,
    Consistency,
    CustomMetric,
}

impl MeasurementType {
    pub fn is_time_based(self) -> bool {
        matches!(
            self,
            MeasurementType::Duration
                | MeasurementType::WorkTime
                | MeasurementType::RestTime
                | MeasurementType::Intervals
                | MeasurementType::Pace
                | MeasurementType::HoldTime
                | MeasurementType::ContactTime
                | MeasurementType::FlightTime
        )
    }

    pub fn is_weight_based(self) -> bool {
        matches!(
            self,
            MeasurementType::Weight | MeasurementType::Bodyweight | MeasurementType::Percentage1rm
        )
    }

    pub fn is_distance_based(self) -> bool {
        matches!(
            self,
            MeasurementType::Distance | MeasurementType::Height | MeasurementType::Depth
        )
    }
}

tag_from_str!(
    BlockType,
    SetType,
    ResultType,
    CompletionStatus,
    WeightUnit,
    LoadingScheme,
    ExerciseCategory,
    MovementPattern,
    ExerciseComplexity,
    MeasurementType,
);

// ============================================================================
// Exercise
// ============================================================================

/// A catalog exercise, shared by reference across items and results
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub primary_muscle: Option<String>,
    #[serde(default)]
    pub secondary_muscles: Vec<String>,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub category: Option<ExerciseCategory>,
    #[serde(default)]
    pub movement_pattern: Option<MovementPattern>,
    #[serde(default)]
    pub complexity: Option<ExerciseComplexity>,
    #[serde(default)]
    pub measurement_types: BTreeSet<MeasurementType>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Exercise {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ExerciseId::new(),
            name: name.into(),
            description: None,
            primary_muscle: None,
            secondary_muscles: Vec::new(),
            equipment: None,
            category: None,
            movement_pattern: None,
            complexity: None,
            measurement_types: BTreeSet::new(),
            tags: Vec::new(),
            notes: None,
        }
    }

    /// Minimal catalog entry created by the create-or-get fallback
    pub fn stub(name: impl Into<String>, category: ExerciseCategory) -> Self {
        let mut exercise = Self::new(name);
        exercise.category = Some(category);
        exercise.complexity = Some(ExerciseComplexity::Intermediate);
        exercise.tags.push("auto_created".into());
        exercise
    }

    /// Case-insensitive exact name comparison used for create-or-get
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}
