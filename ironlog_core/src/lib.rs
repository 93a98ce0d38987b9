#![forbid(unsafe_code)]

//! Core domain model and business logic for the ironlog training log.
//!
//! This crate provides:
//! - Domain types (exercises, programs, blocks, sets, sessions)
//! - Exercise catalog and program import
//! - The training session lifecycle
//! - Persistence (SQLite store, working-session file, CSV export)
//! - One-rep-max estimation and technique processing
//! - Training totals (volume, gym time, week streak)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod one_rm;
pub mod technique;
pub mod db;
pub mod history;
pub mod state;
pub mod catalog;
pub mod program;
pub mod session;
pub mod export;
pub mod stats;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use db::Database;
pub use technique::{display_groups, ExerciseGroup, Technique, TechniqueTag};
pub use state::SessionStore;
pub use catalog::{ExerciseImport, import_exercises, add_exercise};
pub use program::{delete_program, import_or_update, MergeReport, ProgramDefinition};
pub use session::SessionManager;
pub use export::export_csv;
pub use stats::{training_stats, TrainingStats};
