//! CSV export of the training history.
//!
//! One row per persisted set. The file is written to a temp file in the
//! target directory, synced, and renamed into place, so a failed export
//! never leaves a half-written file behind.

use crate::db::uuid_at;
use crate::{normalize_week, one_rm, Database, Result};
use std::path::Path;
use tempfile::NamedTempFile;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    session_id: String,
    program: String,
    block: String,
    week: Option<u32>,
    started_at: String,
    exercise: String,
    set_number: u32,
    weight: f64,
    reps: u32,
    bodyweight: bool,
    ignore_for_one_rm: bool,
    estimated_one_rm: f64,
}

fn rows(db: &Database) -> Result<Vec<CsvRow>> {
    let mut stmt = db.conn().prepare(
        "SELECT ts.id, p.name, pb.name, pb.week, ts.start_time, e.name,
                es.set_index, es.weight, es.reps, es.bodyweight, es.ignore_for_one_rm
         FROM exercise_sets es
         JOIN training_session_exercises tse ON tse.id = es.session_exercise_id
         JOIN training_sessions ts ON ts.id = tse.training_session_id
         JOIN program_blocks pb ON pb.id = ts.program_block_id
         JOIN programs p ON p.id = pb.program_id
         JOIN exercises e ON e.id = tse.exercise_id
         ORDER BY ts.start_time, tse.position, es.set_index",
    )?;

    let rows = stmt
        .query_map([], |row| {
            let set_index: u32 = row.get(6)?;
            let weight: f64 = row.get(7)?;
            let reps: u32 = row.get(8)?;
            Ok(CsvRow {
                session_id: uuid_at(row, 0)?.to_string(),
                program: row.get(1)?,
                block: row.get(2)?,
                week: normalize_week(row.get(3)?),
                started_at: row.get(4)?,
                exercise: row.get(5)?,
                set_number: set_index + 1,
                weight,
                reps,
                bodyweight: row.get(9)?,
                ignore_for_one_rm: row.get(10)?,
                estimated_one_rm: one_rm::estimate(weight, reps),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Write every persisted set to `csv_path`, replacing any existing file.
///
/// Returns the number of rows written. Nothing is written when there is no
/// history.
pub fn export_csv(db: &Database, csv_path: &Path) -> Result<usize> {
    let rows = rows(db)?;
    if rows.is_empty() {
        tracing::info!("No sets to export");
        return Ok(0);
    }

    let parent = match csv_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file());
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(csv_path)
        .map_err(|e| crate::Error::Io(e.error))?;

    tracing::info!("Exported {} sets to {:?}", rows.len(), csv_path);
    Ok(rows.len())
}
