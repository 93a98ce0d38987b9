//! The training session lifecycle.
//!
//! There is at most one session in progress. `start` materializes it from a
//! program block, the mutating commands edit the working copy, and `end`
//! commits it to the database in one transaction. Nothing reaches the
//! database before `end`; `cancel` throws the working copy away.
//!
//! Every operation holds the session lock from its first read to its last
//! write, and only saves the working copy when the whole operation
//! succeeded. A failed command therefore leaves the session exactly as it was.

use crate::config::TechniqueConfig;
use crate::state::SessionStore;
use crate::technique::{self, Technique};
use crate::{
    history, names_match, normalize_week, Database, Error, Exercise, ExerciseSet, LoggedExercise,
    Program, ProgramBlock, Result, SessionExercise, SessionState, TrainingSession,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Expand a rep scheme to `count` entries.
///
/// A short scheme repeats its last entry, an empty one yields blanks.
pub fn expand_rep_scheme(scheme: &[String], count: usize) -> Vec<String> {
    let fill = scheme.last().cloned().unwrap_or_default();
    (0..count)
        .map(|i| scheme.get(i).cloned().unwrap_or_else(|| fill.clone()))
        .collect()
}

/// Drives the in-progress session against the durable store
pub struct SessionManager {
    db: Database,
    store: SessionStore,
    hell_min_reps: u32,
}

impl SessionManager {
    pub fn new(db: Database, store: SessionStore, technique: &TechniqueConfig) -> Self {
        Self {
            db,
            store,
            hell_min_reps: technique.hell_min_reps,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The session in progress
    pub fn current(&self) -> Result<SessionState> {
        let lock = self.store.acquire()?;
        lock.load()?.ok_or_else(Error::no_active_session)
    }

    /// Begin a session for a program block.
    ///
    /// `week` picks between blocks that share a name across weeks.
    pub fn start(
        &self,
        program_name: &str,
        block_name: &str,
        week: Option<u32>,
    ) -> Result<SessionState> {
        let lock = self.store.acquire()?;
        if lock.exists() {
            return Err(Error::Conflict(
                "a session is already in progress; end or cancel it first".into(),
            ));
        }

        let program = self
            .db
            .program_by_name(program_name)?
            .ok_or_else(|| Error::not_found(format!("program '{}'", program_name)))?;
        let block = select_block(&program, block_name, week)?;
        if block.exercises.is_empty() {
            return Err(Error::not_found(format!(
                "exercises in block '{}' of program '{}'",
                block.name, program.name
            )));
        }

        let mut exercises = Vec::with_capacity(block.exercises.len());
        for planned in &block.exercises {
            let exercise = self.db.exercise_by_id(planned.exercise_id)?.ok_or_else(|| {
                Error::not_found(format!("exercise '{}'", planned.exercise_name))
            })?;
            let count = planned.sets as usize;
            let previous_sets =
                history::previous_aligned(self.db.conn(), exercise.id, block.id, count)?;

            exercises.push(SessionExercise {
                id: Uuid::new_v4(),
                exercise,
                sets: (0..count).map(|_| ExerciseSet::sentinel()).collect(),
                previous_sets,
                target_reps: expand_rep_scheme(&planned.reps, count),
                target_rpe: planned.target_rpe.clone(),
                target_rm_percent: planned.target_rm_percent.clone(),
                program_notes: planned.notes.clone(),
                session_notes: String::new(),
                options: planned.options.clone(),
                technique: Technique::resolve(
                    planned.technique,
                    planned.technique_group,
                    self.hell_min_reps,
                ),
                program_one_rm: planned.program_one_rm,
            });
        }

        let state = SessionState {
            session_id: Uuid::new_v4(),
            program_id: program.id,
            program_name: program.name.clone(),
            block_id: block.id,
            block_name: block.name.clone(),
            block_description: block.description.clone(),
            week: block.week,
            start_time: Utc::now(),
            notes: String::new(),
            exercises,
        };
        lock.save(&state)?;

        tracing::info!(
            "Started session {} for {} / {}",
            state.session_id,
            state.program_name,
            state.block_name
        );
        Ok(state)
    }

    /// Append a catalog exercise that is not part of the block
    pub fn add_exercise(&self, name: &str, set_count: usize) -> Result<SessionExercise> {
        if set_count == 0 {
            return Err(Error::Validation("an exercise needs at least one set".into()));
        }

        self.mutate(|db, state| {
            let exercise = db
                .exercise_by_name(name)?
                .ok_or_else(|| Error::not_found(format!("exercise '{}'", name)))?;
            let previous =
                history::previous_aligned(db.conn(), exercise.id, state.block_id, set_count)?;

            let entry = SessionExercise::ad_hoc(exercise, set_count, previous);
            state.exercises.push(entry.clone());
            tracing::info!("Added exercise '{}' to session", entry.exercise.name);
            Ok(entry)
        })
    }

    /// Log an extra set beyond the planned ones
    pub fn add_set(
        &self,
        index: usize,
        weight: f64,
        reps: u32,
        bodyweight: bool,
    ) -> Result<ExerciseSet> {
        check_weight(weight)?;
        self.mutate(|_, state| {
            let exercise = state.exercise_mut(index)?;
            let set = ExerciseSet::performed(weight, reps, bodyweight);
            exercise.sets.push(set.clone());
            exercise
                .previous_sets
                .resize_with(exercise.sets.len(), ExerciseSet::sentinel);
            Ok(set)
        })
    }

    /// Fill a set slot; without `set_index` the first unperformed slot is used.
    ///
    /// Returns the 1-based slot that was written.
    pub fn edit_set(
        &self,
        index: usize,
        weight: f64,
        reps: u32,
        bodyweight: bool,
        set_index: Option<usize>,
    ) -> Result<usize> {
        check_weight(weight)?;
        self.mutate(|_, state| {
            let exercise = state.exercise_mut(index)?;
            let slot = match set_index {
                Some(n) => {
                    if n == 0 || n > exercise.sets.len() {
                        return Err(Error::Range(format!(
                            "set {} does not exist ('{}' has {} sets)",
                            n,
                            exercise.exercise.name,
                            exercise.sets.len()
                        )));
                    }
                    n - 1
                }
                None => exercise
                    .sets
                    .iter()
                    .position(ExerciseSet::is_sentinel)
                    .ok_or_else(|| {
                        Error::State(format!(
                            "all sets of '{}' are filled; give a set number to overwrite one",
                            exercise.exercise.name
                        ))
                    })?,
            };

            exercise.sets[slot] = ExerciseSet::performed(weight, reps, bodyweight);
            Ok(slot + 1)
        })
    }

    /// Replace an exercise with one of its configured variations
    pub fn swap(&self, index: usize, variation: &str) -> Result<Exercise> {
        self.mutate(|db, state| {
            let block_id = state.block_id;
            let entry = state.exercise_mut(index)?;
            let chosen = resolve_variation(entry, variation)?;
            let replacement = db
                .exercise_by_name(&chosen)?
                .ok_or_else(|| Error::not_found(format!("exercise '{}'", chosen)))?;
            let previous =
                history::previous_aligned(db.conn(), replacement.id, block_id, entry.sets.len())?;

            tracing::info!(
                "Swapped '{}' for '{}'",
                entry.exercise.name,
                replacement.name
            );
            entry.exercise = replacement.clone();
            entry.program_one_rm = None;
            entry.previous_sets = previous;
            Ok(replacement)
        })
    }

    pub fn note(&self, index: usize, text: &str) -> Result<()> {
        self.mutate(|_, state| {
            state.exercise_mut(index)?.session_notes = text.to_string();
            Ok(())
        })
    }

    /// Discard the session in progress
    pub fn cancel(&self) -> Result<()> {
        let lock = self.store.acquire()?;
        if !lock.exists() {
            return Err(Error::no_active_session());
        }
        lock.clear()?;
        tracing::info!("Cancelled session");
        Ok(())
    }

    /// Commit the session in progress and close it.
    ///
    /// If the commit fails nothing is written and the session stays open.
    pub fn end(&mut self) -> Result<TrainingSession> {
        let lock = self.store.acquire()?;
        let state = lock.load()?.ok_or_else(Error::no_active_session)?;

        // An earlier end may have committed but failed to clear the working copy
        if let Some(stored) = self.db.session_by_id(state.session_id)? {
            tracing::warn!(
                "Session {} is already committed; closing the working copy",
                stored.id
            );
            lock.clear()?;
            return Ok(stored);
        }

        let session = finalize(&state, Utc::now());
        self.db.commit_session(&session)?;
        lock.clear()?;

        tracing::info!("Ended session {}", session.id);
        Ok(session)
    }

    fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database, &mut SessionState) -> Result<T>,
    {
        let lock = self.store.acquire()?;
        let mut state = lock.load()?.ok_or_else(Error::no_active_session)?;
        let out = f(&self.db, &mut state)?;
        lock.save(&state)?;
        Ok(out)
    }
}

fn check_weight(weight: f64) -> Result<()> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(Error::Validation(format!(
            "weight must be a non-negative number, got {}",
            weight
        )));
    }
    Ok(())
}

/// Turn the working copy into the session that gets committed
pub fn finalize(state: &SessionState, end_time: DateTime<Utc>) -> TrainingSession {
    TrainingSession {
        id: state.session_id,
        program_block_id: state.block_id,
        program_name: state.program_name.clone(),
        block_name: state.block_name.clone(),
        week: state.week,
        start_time: state.start_time,
        end_time: Some(end_time),
        notes: state.notes.clone(),
        exercises: state
            .exercises
            .iter()
            .map(|e| LoggedExercise {
                id: e.id,
                exercise: e.exercise.clone(),
                notes: e.session_notes.clone(),
                sets: technique::apply(&e.technique, e.sets.clone()),
            })
            .collect(),
    }
}

fn select_block<'p>(
    program: &'p Program,
    name: &str,
    week: Option<u32>,
) -> Result<&'p ProgramBlock> {
    let candidates: Vec<&'p ProgramBlock> = program
        .blocks
        .iter()
        .filter(|b| names_match(&b.name, name))
        .collect();

    if let Some(week) = normalize_week(week) {
        return candidates
            .into_iter()
            .find(|b| b.week == Some(week))
            .ok_or_else(|| {
                Error::not_found(format!(
                    "block '{}' week {} in program '{}'",
                    name, week, program.name
                ))
            });
    }

    match candidates.as_slice() {
        [] => Err(Error::not_found(format!(
            "block '{}' in program '{}'",
            name, program.name
        ))),
        [only] => Ok(*only),
        several => {
            if let Some(unweeked) = several.iter().find(|b| b.week.is_none()) {
                return Ok(*unweeked);
            }
            let weeks: Vec<String> = several
                .iter()
                .filter_map(|b| b.week.map(|w| w.to_string()))
                .collect();
            Err(Error::Validation(format!(
                "block '{}' exists in weeks {}; choose one with --week",
                name,
                weeks.join(", ")
            )))
        }
    }
}

/// A variation by 1-based position or case-insensitive name
fn resolve_variation(entry: &SessionExercise, variation: &str) -> Result<String> {
    if entry.options.is_empty() {
        return Err(Error::Validation(format!(
            "'{}' has no variations to swap to",
            entry.exercise.name
        )));
    }

    if let Ok(n) = variation.trim().parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| entry.options.get(i))
            .cloned()
            .ok_or_else(|| {
                Error::Validation(format!(
                    "variation {} does not exist ('{}' has {})",
                    n,
                    entry.exercise.name,
                    entry.options.len()
                ))
            });
    }

    entry
        .options
        .iter()
        .find(|o| names_match(o, variation))
        .cloned()
        .ok_or_else(|| {
            Error::Validation(format!(
                "'{}' is not a variation of '{}' (allowed: {})",
                variation,
                entry.exercise.name,
                entry.options.join(", ")
            ))
        })
}
