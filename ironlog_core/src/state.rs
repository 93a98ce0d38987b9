//! Working-session persistence with file locking.
//!
//! The in-progress session is a single JSON document next to the database.
//! Every command that touches it holds an exclusive lock on a sibling
//! `.lock` file for its whole read-modify-write cycle, so two commands
//! running at once cannot interleave.

use crate::{Error, Result, SessionState};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Location of the working session document
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until no other command holds the session, then take it.
    ///
    /// The lock is released when the returned guard is dropped.
    pub fn acquire(&self) -> Result<SessionLock> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        file.lock_exclusive()?;
        tracing::trace!("Acquired session lock {:?}", self.lock_path);

        Ok(SessionLock {
            file,
            path: self.path.clone(),
        })
    }
}

/// Exclusive access to the working session for the lifetime of the guard
pub struct SessionLock {
    file: File,
    path: PathBuf,
}

impl SessionLock {
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the working session, `None` if there is none.
    ///
    /// A document that cannot be parsed is an error; `clear` still works on it.
    pub fn load(&self) -> Result<Option<SessionState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str::<SessionState>(&contents) {
            Ok(state) => {
                tracing::debug!("Loaded working session {} from {:?}", state.session_id, self.path);
                Ok(Some(state))
            }
            Err(e) => {
                tracing::warn!("Working session {:?} is unreadable: {}", self.path, e);
                Err(Error::State(format!(
                    "working session at {} is unreadable ({}); cancel it to start over",
                    self.path.display(),
                    e
                )))
            }
        }
    }

    /// Atomically replace the working session document
    ///
    /// Writes to a temp file in the same directory, syncs it, then renames
    /// it over the old document.
    pub fn save(&self, state: &SessionState) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "session path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, state)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved working session {} to {:?}", state.session_id, self.path);
        Ok(())
    }

    /// Remove the working session document without reading it
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Cleared working session {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release session lock: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Exercise, Muscle, SessionExercise};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_state() -> SessionState {
        SessionState {
            session_id: Uuid::new_v4(),
            program_id: Uuid::new_v4(),
            program_name: "Strength".into(),
            block_id: Uuid::new_v4(),
            block_name: "Lower A".into(),
            block_description: String::new(),
            week: Some(2),
            start_time: Utc::now(),
            notes: String::new(),
            exercises: vec![SessionExercise::ad_hoc(
                Exercise::new("Squat", "", Muscle::Quads),
                3,
                vec![],
            )],
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(temp_dir.path().join("current_session.json"));
        let state = sample_state();

        let lock = store.acquire().unwrap();
        assert!(lock.load().unwrap().is_none());
        lock.save(&state).unwrap();

        let loaded = lock.load().unwrap().unwrap();
        assert_eq!(loaded.session_id, state.session_id);
        assert_eq!(loaded.week, Some(2));
        assert_eq!(loaded.exercises[0].sets.len(), 3);
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(temp_dir.path().join("current_session.json"));

        let lock = store.acquire().unwrap();
        lock.save(&sample_state()).unwrap();
        lock.save(&sample_state()).unwrap();

        let mut names: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["current_session.json", "current_session.lock"]);
    }

    #[test]
    fn test_corrupted_state_is_error_but_clearable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("current_session.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let store = SessionStore::new(&path);
        let lock = store.acquire().unwrap();
        assert!(matches!(lock.load(), Err(Error::State(_))));

        lock.clear().unwrap();
        assert!(!lock.exists());
        assert!(lock.load().unwrap().is_none());
    }

    #[test]
    fn test_lock_is_released_on_drop() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(temp_dir.path().join("current_session.json"));

        drop(store.acquire().unwrap());
        let again = store.acquire().unwrap();
        again.clear().unwrap();
    }
}
