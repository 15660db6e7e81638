#![forbid(unsafe_code)]

//! Core domain model and business logic for the Regimen training system.
//!
//! This crate provides:
//! - Domain types (exercises, methodologies, identifiers)
//! - Program planning (programs, sessions, blocks, prescriptions)
//! - Result recording and the metrics derivation engine
//! - Range analytics and methodology reports
//! - Persistence (in-memory and JSON file stores, CSV export)

pub mod types;
pub mod error;
pub mod tempo;
pub mod prescription;
pub mod program;
pub mod results;
pub mod metrics;
pub mod clock;
pub mod store;
pub mod catalog;
pub mod planning;
pub mod recording;
pub mod analytics;
pub mod export;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use tempo::Tempo;
pub use prescription::{AdvancedPrescription, Load, Prescription, RepTarget, SimplePrescription};
pub use program::{BlockItem, ExerciseBlock, Program, SessionTemplate};
pub use results::{BlockMetrics, BlockResult, SetResult, WorkoutResult};
pub use clock::{Clock, FixedClock, SystemClock};
pub use store::{FileStore, MemoryStore, Repository, WorkoutFilter};
pub use catalog::{ExerciseCatalog, ExerciseRef, MissingExercisePolicy};
pub use planning::PlanningService;
pub use recording::{BlockEntry, RecordingService, SetEntry};
pub use analytics::{AnalyticsReport, AnalyticsService};
pub use export::export_set_results;
