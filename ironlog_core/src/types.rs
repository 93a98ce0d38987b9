//! Core domain types for the training log.
//!
//! This module defines the fundamental types used throughout the system:
//! - The exercise catalog (exercises, muscles)
//! - Programs and their blocks
//! - Sets, the in-progress working session and committed sessions

use crate::technique::{Technique, TechniqueTag};
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Case-insensitive name comparison used for every program/block/exercise lookup.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// A week number of 0 means "not part of a week cycle".
pub fn normalize_week(week: Option<u32>) -> Option<u32> {
    week.filter(|w| *w != 0)
}

// ============================================================================
// Exercise Catalog
// ============================================================================

/// Primary muscle group worked by an exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Muscle {
    Biceps,
    Triceps,
    Forearms,
    Chest,
    Shoulders,
    Back,
    Quads,
    Hamstrings,
    Glutes,
    Calves,
    Abs,
}

impl Muscle {
    pub const ALL: [Muscle; 11] = [
        Muscle::Biceps,
        Muscle::Triceps,
        Muscle::Forearms,
        Muscle::Chest,
        Muscle::Shoulders,
        Muscle::Back,
        Muscle::Quads,
        Muscle::Hamstrings,
        Muscle::Glutes,
        Muscle::Calves,
        Muscle::Abs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Muscle::Biceps => "biceps",
            Muscle::Triceps => "triceps",
            Muscle::Forearms => "forearms",
            Muscle::Chest => "chest",
            Muscle::Shoulders => "shoulders",
            Muscle::Back => "back",
            Muscle::Quads => "quads",
            Muscle::Hamstrings => "hamstrings",
            Muscle::Glutes => "glutes",
            Muscle::Calves => "calves",
            Muscle::Abs => "abs",
        }
    }
}

impl fmt::Display for Muscle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Muscle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Muscle::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| Error::Validation(format!("unknown primary muscle '{}'", s)))
    }
}

/// A catalog exercise (e.g., "Back Squat")
///
/// `estimated_one_rm`, `best_set` and `last_performed` are derived from the
/// committed history every time the exercise is read.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub primary_muscle: Muscle,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub estimated_one_rm: f64,
    #[serde(default)]
    pub best_set: Option<ExerciseSet>,
    #[serde(default)]
    pub last_performed: Option<DateTime<Utc>>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, description: impl Into<String>, muscle: Muscle) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            primary_muscle: muscle,
            created_at: Utc::now(),
            estimated_one_rm: 0.0,
            best_set: None,
            last_performed: None,
        }
    }
}

// ============================================================================
// Sets
// ============================================================================

/// One performed (or not yet performed) set
///
/// `(weight 0, reps 0)` is the sentinel for "not performed" in a working
/// session and "no data" in the previous-session column.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSet {
    pub id: Uuid,
    pub weight: f64,
    pub reps: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub bodyweight: bool,
    /// Set by the technique processor only
    #[serde(default)]
    pub ignore_for_one_rm: bool,
}

impl ExerciseSet {
    pub fn sentinel() -> Self {
        Self {
            id: Uuid::new_v4(),
            weight: 0.0,
            reps: 0,
            timestamp: Utc::now(),
            bodyweight: false,
            ignore_for_one_rm: false,
        }
    }

    /// A set logged now. Bodyweight sets always carry weight 0.
    pub fn performed(weight: f64, reps: u32, bodyweight: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            weight: if bodyweight { 0.0 } else { weight },
            reps,
            timestamp: Utc::now(),
            bodyweight,
            ignore_for_one_rm: false,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.weight == 0.0 && self.reps == 0
    }

    pub fn estimated_one_rm(&self) -> f64 {
        crate::one_rm::estimate(self.weight, self.reps)
    }
}

// ============================================================================
// Programs
// ============================================================================

/// A training program, identified by its (case-insensitive) name
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub blocks: Vec<ProgramBlock>,
}

/// A training day within a program, optionally tied to a week
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgramBlock {
    pub id: Uuid,
    pub program_id: Uuid,
    pub name: String,
    pub description: String,
    pub week: Option<u32>,
    /// Ordered by `order_index`
    pub exercises: Vec<ProgramExercise>,
}

/// An exercise slot inside a block
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgramExercise {
    pub id: Uuid,
    pub block_id: Uuid,
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub sets: u32,
    pub reps: Vec<String>,
    pub target_rpe: Vec<f64>,
    pub target_rm_percent: Vec<f64>,
    pub notes: String,
    pub program_one_rm: Option<f64>,
    pub options: Vec<String>,
    pub technique: Option<TechniqueTag>,
    pub technique_group: i64,
    pub order_index: u32,
}

// ============================================================================
// Working Session
// ============================================================================

/// Session-scoped working copy of one exercise
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionExercise {
    pub id: Uuid,
    pub exercise: Exercise,
    pub sets: Vec<ExerciseSet>,
    /// Same length as `sets`
    pub previous_sets: Vec<ExerciseSet>,
    #[serde(default)]
    pub target_reps: Vec<String>,
    #[serde(default)]
    pub target_rpe: Vec<f64>,
    #[serde(default)]
    pub target_rm_percent: Vec<f64>,
    #[serde(default)]
    pub program_notes: String,
    #[serde(default)]
    pub session_notes: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub technique: Technique,
    #[serde(default)]
    pub program_one_rm: Option<f64>,
}

impl SessionExercise {
    /// An exercise added mid-session: no program targets, no variations.
    pub fn ad_hoc(exercise: Exercise, set_count: usize, previous_sets: Vec<ExerciseSet>) -> Self {
        Self {
            id: Uuid::new_v4(),
            exercise,
            sets: (0..set_count).map(|_| ExerciseSet::sentinel()).collect(),
            previous_sets,
            target_reps: Vec::new(),
            target_rpe: Vec::new(),
            target_rm_percent: Vec::new(),
            program_notes: String::new(),
            session_notes: String::new(),
            options: Vec::new(),
            technique: Technique::None,
            program_one_rm: None,
        }
    }

    /// Absolute target weight for a set (0-based), from %1RM and the reference 1RM
    pub fn target_weight(&self, set_index: usize) -> Option<f64> {
        let percent = self.target_rm_percent.get(set_index)?;
        let one_rm = self.program_one_rm?;
        Some(one_rm * percent / 100.0)
    }

    pub fn performed_sets(&self) -> usize {
        self.sets.iter().filter(|s| !s.is_sentinel()).count()
    }
}

/// The single in-progress session, persisted between commands
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: Uuid,
    pub program_id: Uuid,
    pub program_name: String,
    pub block_id: Uuid,
    pub block_name: String,
    #[serde(default)]
    pub block_description: String,
    #[serde(default)]
    pub week: Option<u32>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    pub exercises: Vec<SessionExercise>,
}

impl SessionState {
    /// Look up a working exercise by its 1-based index
    pub fn exercise_mut(&mut self, index: usize) -> Result<&mut SessionExercise> {
        let count = self.exercises.len();
        index
            .checked_sub(1)
            .and_then(|i| self.exercises.get_mut(i))
            .ok_or_else(|| {
                Error::Range(format!(
                    "exercise {} does not exist (session has {} exercises)",
                    index, count
                ))
            })
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.start_time
    }
}

// ============================================================================
// Committed Sessions
// ============================================================================

/// An exercise as recorded in a committed session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggedExercise {
    pub id: Uuid,
    pub exercise: Exercise,
    pub notes: String,
    pub sets: Vec<ExerciseSet>,
}

/// A training session in the durable store
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: Uuid,
    pub program_block_id: Uuid,
    pub program_name: String,
    pub block_name: String,
    pub week: Option<u32>,
    pub start_time: DateTime<Utc>,
    /// Absent while the session is still open
    pub end_time: Option<DateTime<Utc>>,
    pub notes: String,
    pub exercises: Vec<LoggedExercise>,
}

impl TrainingSession {
    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn total_volume(&self) -> f64 {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .map(|s| s.weight * f64::from(s.reps))
            .sum()
    }
}

/// One line of the session history listing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub program_name: String,
    pub block_name: String,
    pub week: Option<u32>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub exercise_count: usize,
    pub set_count: usize,
}
