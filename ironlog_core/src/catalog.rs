//! Exercise catalog management.
//!
//! Exercises are imported from a TOML file of `[[exercise]]` tables or added
//! one at a time. Names are unique ignoring case; re-importing an existing
//! name updates it in place and keeps its id.

use crate::db::{exercise_id_by_name, timestamp};
use crate::{Database, Error, Exercise, Muscle, Result};
use rusqlite::params;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// Contents of an exercise import file
#[derive(Clone, Debug, Deserialize, Default)]
pub struct ExerciseImport {
    #[serde(default, rename = "exercise")]
    pub exercises: Vec<ExerciseDefinition>,
}

/// One `[[exercise]]` entry
#[derive(Clone, Debug, Deserialize)]
pub struct ExerciseDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub primary_muscle: String,
}

impl ExerciseImport {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let import = Self::from_toml_str(&contents)?;
        tracing::debug!("Read {} exercises from {:?}", import.exercises.len(), path);
        Ok(import)
    }

    /// Check the import and return any issues found
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for (i, def) in self.exercises.iter().enumerate() {
            let name = def.name.trim();
            if name.is_empty() {
                issues.push(format!("exercise #{} has an empty name", i + 1));
                continue;
            }
            if !seen.insert(name.to_lowercase()) {
                issues.push(format!("exercise '{}' is listed twice", name));
            }
            if let Err(e) = def.primary_muscle.parse::<Muscle>() {
                issues.push(format!("exercise '{}': {}", name, e));
            }
        }

        issues
    }
}

/// Upsert every exercise in the import, in one transaction.
///
/// Returns the number of exercises written.
pub fn import_exercises(db: &mut Database, import: &ExerciseImport) -> Result<usize> {
    let issues = import.validate();
    if !issues.is_empty() {
        return Err(Error::Validation(issues.join("; ")));
    }

    let tx = db.transaction()?;
    let now = timestamp(&chrono::Utc::now());
    for def in &import.exercises {
        let muscle: Muscle = def.primary_muscle.parse()?;
        tx.execute(
            "INSERT INTO exercises (id, name, description, primary_muscle, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 primary_muscle = excluded.primary_muscle",
            params![
                Uuid::new_v4().to_string(),
                def.name.trim(),
                def.description,
                muscle.as_str(),
                now,
            ],
        )?;
    }
    tx.commit()?;

    tracing::info!("Imported {} exercises", import.exercises.len());
    Ok(import.exercises.len())
}

/// Add a single exercise; fails with `Conflict` if the name is taken
pub fn add_exercise(
    db: &Database,
    name: &str,
    description: &str,
    muscle: Muscle,
) -> Result<Exercise> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("exercise name cannot be empty".into()));
    }
    if exercise_id_by_name(db.conn(), name)?.is_some() {
        return Err(Error::Conflict(format!("exercise '{}' already exists", name)));
    }

    let exercise = Exercise::new(name, description, muscle);
    db.conn().execute(
        "INSERT INTO exercises (id, name, description, primary_muscle, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            exercise.id.to_string(),
            exercise.name,
            exercise.description,
            exercise.primary_muscle.as_str(),
            timestamp(&exercise.created_at),
        ],
    )?;
    tracing::info!("Added exercise '{}'", exercise.name);
    Ok(exercise)
}

/// Exercise with its 1RM estimate, best set and last-performed time
pub fn exercise(db: &Database, name: &str) -> Result<Exercise> {
    db.exercise_by_name(name)?
        .ok_or_else(|| Error::not_found(format!("exercise '{}'", name)))
}
