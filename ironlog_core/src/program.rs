//! Program definitions and the import/update merge.
//!
//! A program definition is a TOML document describing blocks and the
//! exercises in them. Importing it never deletes anything and never changes
//! an existing id: the definition is reconciled against what is stored,
//! turned into a list of insert/update operations, and those operations are
//! applied in a single transaction. Removing a program is a separate,
//! explicit `delete_program`.

use crate::db::{exercise_id_by_name, timestamp, uuid_at};
use crate::technique::TechniqueTag;
use crate::state::SessionStore;
use crate::{names_match, normalize_week, Database, Error, Program, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use uuid::Uuid;

// ============================================================================
// Definition format
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
pub struct ProgramDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub weeks: Vec<WeekDefinition>,
    #[serde(default)]
    pub blocks: Vec<BlockDefinition>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WeekDefinition {
    pub week: u32,
    #[serde(default)]
    pub blocks: Vec<BlockDefinition>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ignored for blocks nested under `[[weeks]]`
    #[serde(default)]
    pub week: Option<u32>,
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExerciseEntry {
    pub name: String,
    pub sets: u32,
    #[serde(default)]
    pub reps: Vec<String>,
    #[serde(default)]
    pub target_rpe: Vec<f64>,
    #[serde(default)]
    pub target_rm_percent: Vec<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, rename = "program_1rm")]
    pub program_one_rm: Option<f64>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub technique: Option<TechniqueTag>,
    #[serde(default)]
    pub group: i64,
}

impl ProgramDefinition {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Every block with its effective week, in definition order
    pub fn all_blocks(&self) -> Vec<(Option<u32>, &BlockDefinition)> {
        let nested = self.weeks.iter().flat_map(|w| {
            w.blocks
                .iter()
                .map(move |b| (normalize_week(Some(w.week)), b))
        });
        let flat = self.blocks.iter().map(|b| (normalize_week(b.week), b));
        nested.chain(flat).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("program name cannot be empty".into()));
        }

        let mut block_keys = HashSet::new();
        for (week, block) in self.all_blocks() {
            let block_name = block.name.trim();
            if block_name.is_empty() {
                return Err(Error::Validation(format!(
                    "program '{}' has a block with an empty name",
                    self.name
                )));
            }
            if !block_keys.insert((block_name.to_lowercase(), week)) {
                return Err(Error::Validation(format!(
                    "block '{}'{} is defined twice",
                    block_name,
                    week_suffix(week)
                )));
            }

            let mut exercise_names = HashSet::new();
            for entry in &block.exercises {
                let name = entry.name.trim();
                if name.is_empty() {
                    return Err(Error::Validation(format!(
                        "block '{}' has an exercise with an empty name",
                        block_name
                    )));
                }
                if entry.sets == 0 {
                    return Err(Error::Validation(format!(
                        "exercise '{}' in block '{}' must have at least one set",
                        name, block_name
                    )));
                }
                if !exercise_names.insert(name.to_lowercase()) {
                    return Err(Error::Validation(format!(
                        "exercise '{}' appears twice in block '{}'",
                        name, block_name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn week_suffix(week: Option<u32>) -> String {
    week.map(|w| format!(" (week {})", w)).unwrap_or_default()
}

// ============================================================================
// Merge
// ============================================================================

/// What an import changed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub program_id: Uuid,
    pub programs_inserted: usize,
    pub programs_updated: usize,
    pub blocks_inserted: usize,
    pub blocks_updated: usize,
    pub exercises_inserted: usize,
    pub exercises_updated: usize,
}

#[derive(Debug)]
enum MergeOp<'d> {
    InsertProgram {
        id: Uuid,
        name: &'d str,
        description: &'d str,
    },
    UpdateProgram {
        id: Uuid,
        description: &'d str,
    },
    InsertBlock {
        id: Uuid,
        program_id: Uuid,
        name: &'d str,
        description: &'d str,
        week: Option<u32>,
    },
    UpdateBlock {
        id: Uuid,
        description: &'d str,
    },
    InsertExercise {
        id: Uuid,
        block_id: Uuid,
        exercise_id: Uuid,
        entry: &'d ExerciseEntry,
        order_index: u32,
    },
    UpdateExercise {
        id: Uuid,
        entry: &'d ExerciseEntry,
        order_index: u32,
    },
}

/// Create the program or bring an existing one in line with `definition`.
///
/// Blocks and exercises are matched by (name, week) and by exercise; matches
/// are updated in place, everything else is inserted. Nothing is deleted.
/// Any failure, including an exercise missing from the catalog, leaves the
/// store untouched.
pub fn import_or_update(db: &mut Database, definition: &ProgramDefinition) -> Result<MergeReport> {
    definition.validate()?;

    let tx = db.transaction()?;
    let ops = plan(&tx, definition)?;
    let report = apply(&tx, &ops)?;
    tx.commit()?;

    tracing::info!(
        "Imported program '{}': {} blocks added, {} updated; {} exercises added, {} updated",
        definition.name.trim(),
        report.blocks_inserted,
        report.blocks_updated,
        report.exercises_inserted,
        report.exercises_updated
    );
    Ok(report)
}

/// Delete a program with its blocks and planned exercises.
///
/// Refused while the session in progress was started from it, or while any
/// logged session belongs to one of its blocks.
pub fn delete_program(db: &mut Database, store: &SessionStore, name: &str) -> Result<Program> {
    let lock = store.acquire()?;
    if let Some(state) = lock.load()? {
        if names_match(&state.program_name, name) {
            return Err(Error::Conflict(format!(
                "the session in progress uses program '{}'; end or cancel it first",
                state.program_name
            )));
        }
    }
    db.delete_program(name)
}

fn plan<'d>(conn: &Connection, definition: &'d ProgramDefinition) -> Result<Vec<MergeOp<'d>>> {
    let mut ops = Vec::new();

    let existing_program = conn
        .query_row(
            "SELECT id FROM programs WHERE name = ?1",
            params![definition.name.trim()],
            |row| uuid_at(row, 0),
        )
        .optional()?;

    let (program_id, existing_blocks) = match existing_program {
        Some(id) => {
            ops.push(MergeOp::UpdateProgram {
                id,
                description: &definition.description,
            });
            (id, block_keys(conn, id)?)
        }
        None => {
            let id = Uuid::new_v4();
            ops.push(MergeOp::InsertProgram {
                id,
                name: definition.name.trim(),
                description: &definition.description,
            });
            (id, HashMap::new())
        }
    };

    for (week, block) in definition.all_blocks() {
        let key = (block.name.trim().to_lowercase(), week);
        let (block_id, existing_exercises) = match existing_blocks.get(&key) {
            Some(&id) => {
                ops.push(MergeOp::UpdateBlock {
                    id,
                    description: &block.description,
                });
                (id, exercise_keys(conn, id)?)
            }
            None => {
                let id = Uuid::new_v4();
                ops.push(MergeOp::InsertBlock {
                    id,
                    program_id,
                    name: block.name.trim(),
                    description: &block.description,
                    week,
                });
                (id, HashMap::new())
            }
        };

        for (order_index, entry) in block.exercises.iter().enumerate() {
            let exercise_id = exercise_id_by_name(conn, &entry.name)?.ok_or_else(|| {
                Error::not_found(format!(
                    "exercise '{}' (block '{}'{})",
                    entry.name.trim(),
                    block.name.trim(),
                    week_suffix(week)
                ))
            })?;
            let order_index = order_index as u32;

            match existing_exercises.get(&exercise_id) {
                Some(&id) => ops.push(MergeOp::UpdateExercise {
                    id,
                    entry,
                    order_index,
                }),
                None => ops.push(MergeOp::InsertExercise {
                    id: Uuid::new_v4(),
                    block_id,
                    exercise_id,
                    entry,
                    order_index,
                }),
            }
        }
    }

    Ok(ops)
}

/// Stored blocks of a program keyed by (lowercased name, week)
fn block_keys(conn: &Connection, program_id: Uuid) -> Result<HashMap<(String, Option<u32>), Uuid>> {
    let mut stmt =
        conn.prepare("SELECT id, name, week FROM program_blocks WHERE program_id = ?1")?;
    let rows = stmt
        .query_map(params![program_id.to_string()], |row| {
            let name: String = row.get(1)?;
            let week: Option<u32> = row.get(2)?;
            Ok(((name.to_lowercase(), normalize_week(week)), uuid_at(row, 0)?))
        })?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(rows)
}

/// Stored program exercises of a block keyed by exercise id
fn exercise_keys(conn: &Connection, block_id: Uuid) -> Result<HashMap<Uuid, Uuid>> {
    let mut stmt = conn
        .prepare("SELECT exercise_id, id FROM program_exercises WHERE program_block_id = ?1")?;
    let rows = stmt
        .query_map(params![block_id.to_string()], |row| {
            Ok((uuid_at(row, 0)?, uuid_at(row, 1)?))
        })?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(rows)
}

fn apply(conn: &Connection, ops: &[MergeOp<'_>]) -> Result<MergeReport> {
    let mut report = MergeReport::default();

    for op in ops {
        match op {
            MergeOp::InsertProgram {
                id,
                name,
                description,
            } => {
                conn.execute(
                    "INSERT INTO programs (id, name, description, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        id.to_string(),
                        name,
                        description,
                        timestamp(&chrono::Utc::now())
                    ],
                )?;
                report.program_id = *id;
                report.programs_inserted += 1;
            }
            MergeOp::UpdateProgram { id, description } => {
                conn.execute(
                    "UPDATE programs SET description = ?2 WHERE id = ?1",
                    params![id.to_string(), description],
                )?;
                report.program_id = *id;
                report.programs_updated += 1;
            }
            MergeOp::InsertBlock {
                id,
                program_id,
                name,
                description,
                week,
            } => {
                conn.execute(
                    "INSERT INTO program_blocks (id, program_id, name, description, week)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        id.to_string(),
                        program_id.to_string(),
                        name,
                        description,
                        week
                    ],
                )?;
                report.blocks_inserted += 1;
            }
            MergeOp::UpdateBlock { id, description } => {
                conn.execute(
                    "UPDATE program_blocks SET description = ?2 WHERE id = ?1",
                    params![id.to_string(), description],
                )?;
                report.blocks_updated += 1;
            }
            MergeOp::InsertExercise {
                id,
                block_id,
                exercise_id,
                entry,
                order_index,
            } => {
                conn.execute(
                    "INSERT INTO program_exercises
                         (id, program_block_id, exercise_id, sets, reps, target_rpe,
                          target_rm_percent, notes, program_1rm, options, technique,
                          technique_group, order_index)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    params![
                        id.to_string(),
                        block_id.to_string(),
                        exercise_id.to_string(),
                        entry.sets,
                        serde_json::to_string(&entry.reps)?,
                        serde_json::to_string(&entry.target_rpe)?,
                        serde_json::to_string(&entry.target_rm_percent)?,
                        entry.notes,
                        entry.program_one_rm,
                        serde_json::to_string(&entry.options)?,
                        entry.technique.map(|t| t.as_str()),
                        entry.group,
                        order_index,
                    ],
                )?;
                report.exercises_inserted += 1;
            }
            MergeOp::UpdateExercise {
                id,
                entry,
                order_index,
            } => {
                conn.execute(
                    "UPDATE program_exercises SET
                         sets = ?2, reps = ?3, target_rpe = ?4, target_rm_percent = ?5,
                         notes = ?6, program_1rm = ?7, options = ?8, technique = ?9,
                         technique_group = ?10, order_index = ?11
                     WHERE id = ?1",
                    params![
                        id.to_string(),
                        entry.sets,
                        serde_json::to_string(&entry.reps)?,
                        serde_json::to_string(&entry.target_rpe)?,
                        serde_json::to_string(&entry.target_rm_percent)?,
                        entry.notes,
                        entry.program_one_rm,
                        serde_json::to_string(&entry.options)?,
                        entry.technique.map(|t| t.as_str()),
                        entry.group,
                        order_index,
                    ],
                )?;
                report.exercises_updated += 1;
            }
        }
    }

    Ok(report)
}
