//! Durable store backed by SQLite.
//!
//! Everything that survives a session lives here: the exercise catalog,
//! programs with their blocks, and committed training sessions. Ids are
//! UUIDs stored as TEXT, timestamps are RFC3339 UTC with millisecond
//! precision (so text order is time order), and list-valued fields are
//! JSON arrays.

use crate::technique::TechniqueTag;
use crate::{
    normalize_week, one_rm, Error, Exercise, ExerciseSet, LoggedExercise, Muscle, Program,
    ProgramBlock, ProgramExercise, Result, SessionSummary, TrainingSession,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::de::DeserializeOwned;
use std::cmp::Ordering;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS exercises (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE UNICASE,
    description TEXT NOT NULL DEFAULT '',
    primary_muscle TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS programs (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE UNICASE,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS program_blocks (
    id TEXT PRIMARY KEY,
    program_id TEXT NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
    name TEXT NOT NULL COLLATE UNICASE,
    description TEXT NOT NULL DEFAULT '',
    week INTEGER
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_program_blocks_key
    ON program_blocks(program_id, name COLLATE UNICASE, IFNULL(week, 0));

CREATE TABLE IF NOT EXISTS program_exercises (
    id TEXT PRIMARY KEY,
    program_block_id TEXT NOT NULL REFERENCES program_blocks(id) ON DELETE CASCADE,
    exercise_id TEXT NOT NULL REFERENCES exercises(id),
    sets INTEGER NOT NULL,
    reps TEXT NOT NULL DEFAULT '[]',
    target_rpe TEXT NOT NULL DEFAULT '[]',
    target_rm_percent TEXT NOT NULL DEFAULT '[]',
    notes TEXT NOT NULL DEFAULT '',
    program_1rm REAL,
    options TEXT NOT NULL DEFAULT '[]',
    technique TEXT,
    technique_group INTEGER NOT NULL DEFAULT 0,
    order_index INTEGER NOT NULL DEFAULT 0,
    UNIQUE (program_block_id, exercise_id)
);

CREATE TABLE IF NOT EXISTS training_sessions (
    id TEXT PRIMARY KEY,
    program_block_id TEXT NOT NULL REFERENCES program_blocks(id),
    start_time TEXT NOT NULL,
    end_time TEXT,
    notes TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS training_session_exercises (
    id TEXT PRIMARY KEY,
    training_session_id TEXT NOT NULL REFERENCES training_sessions(id) ON DELETE CASCADE,
    exercise_id TEXT NOT NULL REFERENCES exercises(id),
    position INTEGER NOT NULL DEFAULT 0,
    notes TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS exercise_sets (
    id TEXT PRIMARY KEY,
    session_exercise_id TEXT NOT NULL REFERENCES training_session_exercises(id) ON DELETE CASCADE,
    set_index INTEGER NOT NULL,
    weight REAL NOT NULL,
    reps INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    bodyweight INTEGER NOT NULL DEFAULT 0,
    ignore_for_one_rm INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_sessions_block_start
    ON training_sessions(program_block_id, start_time);
CREATE INDEX IF NOT EXISTS idx_session_exercises_exercise
    ON training_session_exercises(exercise_id);
CREATE INDEX IF NOT EXISTS idx_sets_session_exercise
    ON exercise_sets(session_exercise_id);

PRAGMA user_version = 1;
";

const SET_COLUMNS: &str =
    "es.id, es.weight, es.reps, es.timestamp, es.bodyweight, es.ignore_for_one_rm";

/// Handle to the SQLite database
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database file and bring the schema up to date
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self::configure(conn)?;
        tracing::debug!("Opened database at {:?}", path);
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.create_collation("UNICASE", compare_names)?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            tracing::info!("Creating database schema (version 1)");
            self.conn.execute_batch(SCHEMA_V1)?;
        }
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a transaction; dropping it without `commit` rolls back
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Exercise by case-insensitive name, with history-derived stats
    pub fn exercise_by_name(&self, name: &str) -> Result<Option<Exercise>> {
        let exercise = self
            .conn
            .query_row(
                "SELECT id, name, description, primary_muscle, created_at
                 FROM exercises WHERE name = ?1",
                params![name.trim()],
                read_exercise,
            )
            .optional()?;
        exercise.map(|e| self.with_stats(e)).transpose()
    }

    pub fn exercise_by_id(&self, id: Uuid) -> Result<Option<Exercise>> {
        let exercise = self
            .conn
            .query_row(
                "SELECT id, name, description, primary_muscle, created_at
                 FROM exercises WHERE id = ?1",
                params![id.to_string()],
                read_exercise,
            )
            .optional()?;
        exercise.map(|e| self.with_stats(e)).transpose()
    }

    pub fn list_exercises(&self) -> Result<Vec<Exercise>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, primary_muscle, created_at
             FROM exercises ORDER BY name",
        )?;
        let rows = stmt
            .query_map([], read_exercise)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(|e| self.with_stats(e)).collect()
    }

    fn with_stats(&self, mut exercise: Exercise) -> Result<Exercise> {
        let sql = format!(
            "SELECT {SET_COLUMNS} FROM exercise_sets es
             JOIN training_session_exercises tse ON tse.id = es.session_exercise_id
             WHERE tse.exercise_id = ?1 AND es.ignore_for_one_rm = 0 AND es.reps > 0"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let sets = stmt
            .query_map(params![exercise.id.to_string()], read_set)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        exercise.best_set = one_rm::best_set(&sets).cloned();
        exercise.estimated_one_rm = exercise
            .best_set
            .as_ref()
            .map(ExerciseSet::estimated_one_rm)
            .unwrap_or(0.0);

        let last: Option<String> = self.conn.query_row(
            "SELECT MAX(ts.start_time) FROM training_sessions ts
             JOIN training_session_exercises tse ON tse.training_session_id = ts.id
             WHERE tse.exercise_id = ?1 AND ts.end_time IS NOT NULL",
            params![exercise.id.to_string()],
            |row| row.get(0),
        )?;
        exercise.last_performed = last.as_deref().map(parse_time).transpose()?;

        Ok(exercise)
    }

    // ------------------------------------------------------------------
    // Programs
    // ------------------------------------------------------------------

    /// Program by case-insensitive name, with blocks and exercises in order
    pub fn program_by_name(&self, name: &str) -> Result<Option<Program>> {
        let program = self
            .conn
            .query_row(
                "SELECT id, name, description, created_at FROM programs WHERE name = ?1",
                params![name.trim()],
                read_program,
            )
            .optional()?;
        program.map(|p| self.with_blocks(p)).transpose()
    }

    pub fn list_programs(&self) -> Result<Vec<Program>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description, created_at FROM programs ORDER BY name")?;
        let rows = stmt
            .query_map([], read_program)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(|p| self.with_blocks(p)).collect()
    }

    fn with_blocks(&self, mut program: Program) -> Result<Program> {
        let mut stmt = self.conn.prepare(
            "SELECT id, program_id, name, description, week FROM program_blocks
             WHERE program_id = ?1 ORDER BY IFNULL(week, 0), rowid",
        )?;
        let blocks = stmt
            .query_map(params![program.id.to_string()], |row| {
                Ok(ProgramBlock {
                    id: uuid_at(row, 0)?,
                    program_id: uuid_at(row, 1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                    week: normalize_week(row.get(4)?),
                    exercises: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT pe.id, pe.program_block_id, pe.exercise_id, e.name, pe.sets, pe.reps,
                    pe.target_rpe, pe.target_rm_percent, pe.notes, pe.program_1rm,
                    pe.options, pe.technique, pe.technique_group, pe.order_index
             FROM program_exercises pe JOIN exercises e ON e.id = pe.exercise_id
             WHERE pe.program_block_id = ?1
             ORDER BY pe.order_index, pe.rowid",
        )?;
        for mut block in blocks {
            block.exercises = stmt
                .query_map(params![block.id.to_string()], read_program_exercise)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            program.blocks.push(block);
        }
        Ok(program)
    }

    /// Remove a program together with its blocks and planned exercises.
    ///
    /// Refused with `Conflict` while any logged session points at one of its blocks.
    pub fn delete_program(&mut self, name: &str) -> Result<Program> {
        let program = self
            .program_by_name(name)?
            .ok_or_else(|| Error::not_found(format!("program '{}'", name.trim())))?;

        let tx = self.conn.transaction()?;
        let logged: i64 = tx.query_row(
            "SELECT COUNT(*) FROM training_sessions ts
             JOIN program_blocks pb ON pb.id = ts.program_block_id
             WHERE pb.program_id = ?1",
            params![program.id.to_string()],
            |row| row.get(0),
        )?;
        if logged > 0 {
            return Err(Error::Conflict(format!(
                "program '{}' has {} logged sessions",
                program.name, logged
            )));
        }
        tx.execute(
            "DELETE FROM programs WHERE id = ?1",
            params![program.id.to_string()],
        )?;
        tx.commit()?;

        tracing::info!(
            "Deleted program '{}' ({} blocks)",
            program.name,
            program.blocks.len()
        );
        Ok(program)
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Write a finished session, its exercises and sets in one transaction.
    ///
    /// Any failure rolls the whole session back.
    pub fn commit_session(&mut self, session: &TrainingSession) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO training_sessions (id, program_block_id, start_time, end_time, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id.to_string(),
                session.program_block_id.to_string(),
                timestamp(&session.start_time),
                session.end_time.as_ref().map(timestamp),
                session.notes,
            ],
        )?;

        for (position, logged) in session.exercises.iter().enumerate() {
            tx.execute(
                "INSERT INTO training_session_exercises
                     (id, training_session_id, exercise_id, position, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    logged.id.to_string(),
                    session.id.to_string(),
                    logged.exercise.id.to_string(),
                    position as i64,
                    logged.notes,
                ],
            )?;

            for (set_index, set) in logged.sets.iter().enumerate() {
                tx.execute(
                    "INSERT INTO exercise_sets
                         (id, session_exercise_id, set_index, weight, reps, timestamp,
                          bodyweight, ignore_for_one_rm)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        set.id.to_string(),
                        logged.id.to_string(),
                        set_index as i64,
                        set.weight,
                        set.reps,
                        timestamp(&set.timestamp),
                        set.bodyweight,
                        set.ignore_for_one_rm,
                    ],
                )?;
            }
        }

        tx.commit()?;
        tracing::info!(
            "Committed session {} ({} exercises)",
            session.id,
            session.exercises.len()
        );
        Ok(())
    }

    pub fn session_by_id(&self, id: Uuid) -> Result<Option<TrainingSession>> {
        let session = self
            .conn
            .query_row(
                "SELECT ts.id, ts.program_block_id, p.name, pb.name, pb.week,
                        ts.start_time, ts.end_time, ts.notes
                 FROM training_sessions ts
                 JOIN program_blocks pb ON pb.id = ts.program_block_id
                 JOIN programs p ON p.id = pb.program_id
                 WHERE ts.id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(TrainingSession {
                        id: uuid_at(row, 0)?,
                        program_block_id: uuid_at(row, 1)?,
                        program_name: row.get(2)?,
                        block_name: row.get(3)?,
                        week: normalize_week(row.get(4)?),
                        start_time: time_at(row, 5)?,
                        end_time: opt_time_at(row, 6)?,
                        notes: row.get(7)?,
                        exercises: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut session) = session else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, exercise_id, notes FROM training_session_exercises
             WHERE training_session_id = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map(params![id.to_string()], |row| {
                Ok((uuid_at(row, 0)?, uuid_at(row, 1)?, row.get::<_, String>(2)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for (entry_id, exercise_id, notes) in rows {
            let exercise = self
                .exercise_by_id(exercise_id)?
                .ok_or_else(|| Error::not_found(format!("exercise {}", exercise_id)))?;
            session.exercises.push(LoggedExercise {
                id: entry_id,
                exercise,
                notes,
                sets: sets_for_entry(&self.conn, entry_id)?,
            });
        }

        Ok(Some(session))
    }

    /// Committed sessions, newest first, optionally filtered by program and block name
    pub fn list_sessions(
        &self,
        program: Option<&str>,
        block: Option<&str>,
    ) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT ts.id, p.name, pb.name, pb.week, ts.start_time, ts.end_time,
                    (SELECT COUNT(*) FROM training_session_exercises tse
                     WHERE tse.training_session_id = ts.id),
                    (SELECT COUNT(*) FROM exercise_sets es
                     JOIN training_session_exercises tse ON tse.id = es.session_exercise_id
                     WHERE tse.training_session_id = ts.id)
             FROM training_sessions ts
             JOIN program_blocks pb ON pb.id = ts.program_block_id
             JOIN programs p ON p.id = pb.program_id
             WHERE (?1 IS NULL OR p.name = ?1) AND (?2 IS NULL OR pb.name = ?2)
             ORDER BY ts.start_time DESC",
        )?;
        let rows = stmt
            .query_map(params![program, block], |row| {
                Ok(SessionSummary {
                    id: uuid_at(row, 0)?,
                    program_name: row.get(1)?,
                    block_name: row.get(2)?,
                    week: normalize_week(row.get(3)?),
                    start_time: time_at(row, 4)?,
                    end_time: opt_time_at(row, 5)?,
                    exercise_count: row.get::<_, i64>(6)? as usize,
                    set_count: row.get::<_, i64>(7)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

// ----------------------------------------------------------------------
// Queries usable inside a transaction
// ----------------------------------------------------------------------

pub(crate) fn exercise_id_by_name(conn: &Connection, name: &str) -> Result<Option<Uuid>> {
    Ok(conn
        .query_row(
            "SELECT id FROM exercises WHERE name = ?1",
            params![name.trim()],
            |row| uuid_at(row, 0),
        )
        .optional()?)
}

/// Most recent completed session in `block_id` that included `exercise_id`
pub(crate) fn latest_completed_session(
    conn: &Connection,
    exercise_id: Uuid,
    block_id: Uuid,
) -> Result<Option<Uuid>> {
    Ok(conn
        .query_row(
            "SELECT ts.id FROM training_sessions ts
             JOIN training_session_exercises tse ON tse.training_session_id = ts.id
             WHERE tse.exercise_id = ?1
               AND ts.program_block_id = ?2
               AND ts.end_time IS NOT NULL
             ORDER BY ts.start_time DESC
             LIMIT 1",
            params![exercise_id.to_string(), block_id.to_string()],
            |row| uuid_at(row, 0),
        )
        .optional()?)
}

/// Sets an exercise recorded in a session, in performed order.
///
/// If the exercise appears more than once, the first occurrence is used.
pub(crate) fn session_sets_for_exercise(
    conn: &Connection,
    session_id: Uuid,
    exercise_id: Uuid,
) -> Result<Vec<ExerciseSet>> {
    let entry: Option<Uuid> = conn
        .query_row(
            "SELECT id FROM training_session_exercises
             WHERE training_session_id = ?1 AND exercise_id = ?2
             ORDER BY position LIMIT 1",
            params![session_id.to_string(), exercise_id.to_string()],
            |row| uuid_at(row, 0),
        )
        .optional()?;

    match entry {
        Some(entry_id) => sets_for_entry(conn, entry_id),
        None => Ok(Vec::new()),
    }
}

/// Start and end time of every committed session
pub(crate) fn session_times(
    conn: &Connection,
) -> Result<Vec<(DateTime<Utc>, Option<DateTime<Utc>>)>> {
    let mut stmt = conn.prepare("SELECT start_time, end_time FROM training_sessions")?;
    let rows = stmt
        .query_map([], |row| Ok((time_at(row, 0)?, opt_time_at(row, 1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Weight times reps over every loaded set
pub(crate) fn lifted_volume(conn: &Connection) -> Result<f64> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(weight * reps), 0.0) FROM exercise_sets
         WHERE weight > 0 AND reps > 0",
        [],
        |row| row.get(0),
    )?)
}

/// Primary muscle of each performed set in sessions started within `[from, to)`
pub(crate) fn performed_set_muscles(
    conn: &Connection,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> Result<Vec<Muscle>> {
    let mut stmt = conn.prepare(
        "SELECT e.primary_muscle FROM exercise_sets es
         JOIN training_session_exercises tse ON tse.id = es.session_exercise_id
         JOIN training_sessions ts ON ts.id = tse.training_session_id
         JOIN exercises e ON e.id = tse.exercise_id
         WHERE es.reps > 0 AND ts.start_time >= ?1 AND ts.start_time < ?2",
    )?;
    let muscles = stmt
        .query_map(params![timestamp(from), timestamp(to)], |row| {
            row.get::<_, String>(0)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    muscles.iter().map(|m| m.parse()).collect()
}

fn sets_for_entry(conn: &Connection, entry_id: Uuid) -> Result<Vec<ExerciseSet>> {
    let sql = format!(
        "SELECT {SET_COLUMNS} FROM exercise_sets es
         WHERE es.session_exercise_id = ?1
         ORDER BY es.set_index, es.timestamp"
    );
    let mut stmt = conn.prepare(&sql)?;
    let sets = stmt
        .query_map(params![entry_id.to_string()], read_set)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sets)
}

// ----------------------------------------------------------------------
// Row mapping
// ----------------------------------------------------------------------

/// `UNICASE` collation: names compare equal under Unicode lowercasing,
/// the same folding `names_match` uses.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

pub(crate) fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Validation(format!("invalid timestamp '{}': {}", raw, e)))
}

fn conversion<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion(idx, e))
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

fn opt_time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| conversion(idx, e))
    })
    .transpose()
}

fn json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion(idx, e))
}

fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion(idx, e))
}

fn read_exercise(row: &Row<'_>) -> rusqlite::Result<Exercise> {
    Ok(Exercise {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        primary_muscle: parsed_at::<Muscle>(row, 3)?,
        created_at: time_at(row, 4)?,
        estimated_one_rm: 0.0,
        best_set: None,
        last_performed: None,
    })
}

fn read_program(row: &Row<'_>) -> rusqlite::Result<Program> {
    Ok(Program {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: time_at(row, 3)?,
        blocks: Vec::new(),
    })
}

fn read_program_exercise(row: &Row<'_>) -> rusqlite::Result<ProgramExercise> {
    let technique: Option<String> = row.get(11)?;
    let technique = technique
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<TechniqueTag>())
        .transpose()
        .map_err(|e| conversion(11, e))?;

    Ok(ProgramExercise {
        id: uuid_at(row, 0)?,
        block_id: uuid_at(row, 1)?,
        exercise_id: uuid_at(row, 2)?,
        exercise_name: row.get(3)?,
        sets: row.get(4)?,
        reps: json_at(row, 5)?,
        target_rpe: json_at(row, 6)?,
        target_rm_percent: json_at(row, 7)?,
        notes: row.get(8)?,
        program_one_rm: row.get(9)?,
        options: json_at(row, 10)?,
        technique,
        technique_group: row.get(12)?,
        order_index: row.get(13)?,
    })
}

fn read_set(row: &Row<'_>) -> rusqlite::Result<ExerciseSet> {
    Ok(ExerciseSet {
        id: uuid_at(row, 0)?,
        weight: row.get(1)?,
        reps: row.get(2)?,
        timestamp: time_at(row, 3)?,
        bodyweight: row.get(4)?,
        ignore_for_one_rm: row.get(5)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    /// Insert a catalog exercise directly
    pub(crate) fn seed_exercise(db: &Database, name: &str, muscle: Muscle) -> Uuid {
        let exercise = Exercise::new(name, "", muscle);
        db.conn()
            .execute(
                "INSERT INTO exercises (id, name, description, primary_muscle, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    exercise.id.to_string(),
                    exercise.name,
                    exercise.description,
                    exercise.primary_muscle.as_str(),
                    timestamp(&exercise.created_at),
                ],
            )
            .unwrap();
        exercise.id
    }

    #[test]
    fn test_schema_is_created_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/ironlog.db");

        {
            let db = Database::open(&path).unwrap();
            seed_exercise(&db, "Squat", Muscle::Quads);
        }

        let db = Database::open(&path).unwrap();
        let version: i64 = db
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
        assert_eq!(db.list_exercises().unwrap().len(), 1);
    }

    #[test]
    fn test_exercise_lookup_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_exercise(&db, "Back Squat", Muscle::Quads);

        let found = db.exercise_by_name("back SQUAT").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.primary_muscle, Muscle::Quads);
        assert_eq!(found.estimated_one_rm, 0.0);
        assert!(found.last_performed.is_none());
        assert!(db.exercise_by_name("Front Squat").unwrap().is_none());
    }

    #[test]
    fn test_non_ascii_names_compare_case_insensitively() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_exercise(&db, "Elevação Lateral", Muscle::Shoulders);

        let found = db.exercise_by_name("ELEVAÇÃO LATERAL").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(exercise_id_by_name(db.conn(), "elevação lateral").unwrap(), Some(id));

        let duplicate = db.conn().execute(
            "INSERT INTO exercises (id, name, primary_muscle, created_at)
             VALUES (?1, 'ELEVAÇÃO LATERAL', 'shoulders', '2024-01-01T00:00:00.000Z')",
            params![Uuid::new_v4().to_string()],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let now = Utc::now();
        let earlier = timestamp(&(now - Duration::milliseconds(5)));
        let later = timestamp(&now);
        assert!(earlier < later);
        assert!(later.ends_with('Z'));
    }

    #[test]
    fn test_unknown_program_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.program_by_name("Nope").unwrap().is_none());
        assert!(db.list_sessions(None, None).unwrap().is_empty());
    }
}
