//! Previous-session lookup.
//!
//! While training, each exercise shows what was done for it last time.
//! "Last time" is scoped to the same program block: a squat done on
//! lower-body day B does not show up as the reference for day A.

use crate::{db, ExerciseSet, Result};
use rusqlite::Connection;
use uuid::Uuid;

/// Sets recorded for `exercise_id` in the most recent completed session of
/// `block_id`, or `None` if it has never been done in that block.
pub fn resolve_previous(
    conn: &Connection,
    exercise_id: Uuid,
    block_id: Uuid,
) -> Result<Option<Vec<ExerciseSet>>> {
    let Some(session_id) = db::latest_completed_session(conn, exercise_id, block_id)? else {
        tracing::debug!(
            "No previous session for exercise {} in block {}",
            exercise_id,
            block_id
        );
        return Ok(None);
    };

    let sets = db::session_sets_for_exercise(conn, session_id, exercise_id)?;
    tracing::debug!(
        "Previous session {} has {} sets for exercise {}",
        session_id,
        sets.len(),
        exercise_id
    );
    Ok(Some(sets))
}

/// Fit previous sets to exactly `required` entries.
///
/// Missing positions are filled with sentinels and surplus sets are dropped.
pub fn align(previous: Option<&[ExerciseSet]>, required: usize) -> Vec<ExerciseSet> {
    let previous = previous.unwrap_or(&[]);
    (0..required)
        .map(|i| previous.get(i).cloned().unwrap_or_else(ExerciseSet::sentinel))
        .collect()
}

/// `resolve_previous` followed by `align`
pub fn previous_aligned(
    conn: &Connection,
    exercise_id: Uuid,
    block_id: Uuid,
    required: usize,
) -> Result<Vec<ExerciseSet>> {
    let previous = resolve_previous(conn, exercise_id, block_id)?;
    Ok(align(previous.as_deref(), required))
}
