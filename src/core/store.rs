//! Cross-process session state store.
//!
//! Each session owns one JSON file and a companion lock file in the state
//! directory. Every access goes back to disk under an advisory `flock`:
//! shared for reads, exclusive for read-modify-write. Guards are separate
//! short-lived processes, so nothing is cached in memory between calls.
//!
//! `try_*` methods report failures. `read` and `update` fail open: errors are
//! logged and treated as "state absent / unchanged", because the decisions
//! built on this store must never block the caller's primary task.

use crate::core::config::GuardConfig;
use crate::core::error::GuardError;
use crate::core::value::{StateRecord, StateValue};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const LOCK_SUFFIX: &str = ".lock";

/// Handle to one session's backing record.
#[derive(Debug, Clone)]
pub struct SessionStore {
    key: String,
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl SessionStore {
    /// Maps a session key to its backing and lock file paths.
    pub fn locate(config: &GuardConfig, session_key: &str) -> Result<Self, GuardError> {
        if session_key.is_empty()
            || session_key
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            return Err(GuardError::PathError(format!(
                "invalid session key '{}'",
                session_key
            )));
        }
        let state_path = config
            .state_dir
            .join(format!("{}-{}.json", config.file_prefix, session_key));
        let mut lock_name = state_path.as_os_str().to_os_string();
        lock_name.push(LOCK_SUFFIX);
        Ok(Self {
            key: session_key.to_string(),
            state_path,
            lock_path: PathBuf::from(lock_name),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    fn open_lock_file(&self) -> Result<File, GuardError> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|source| GuardError::LockError {
                path: self.lock_path.clone(),
                source,
            })
    }

    /// Reads the record under a shared lock.
    ///
    /// A missing or malformed backing file yields an empty record; only lock
    /// and I/O failures are errors.
    pub fn try_read(&self) -> Result<StateRecord, GuardError> {
        let lock_file = self.open_lock_file()?;
        FileExt::lock_shared(&lock_file).map_err(|source| GuardError::LockError {
            path: self.lock_path.clone(),
            source,
        })?;
        let record = load_record(&self.state_path);
        drop(lock_file);
        record
    }

    /// Fail-open read: any error yields an empty record.
    pub fn read(&self) -> StateRecord {
        self.try_read().unwrap_or_else(|err| {
            tracing::warn!(
                target: "hookguard::store",
                session = %self.key,
                error = %err,
                "state_read_failed"
            );
            StateRecord::new()
        })
    }

    /// Runs `mutate` against the current record under an exclusive lock and
    /// persists the result.
    ///
    /// The record is loaded fresh (empty if missing or unreadable), and
    /// written back through a temp file plus rename, so a failure never leaves
    /// a half-written file. Nothing is written when `mutate` leaves the record
    /// unchanged.
    pub fn try_update<R>(
        &self,
        mutate: impl FnOnce(&mut StateRecord) -> R,
    ) -> Result<R, GuardError> {
        let lock_file = self.open_lock_file()?;
        FileExt::lock_exclusive(&lock_file).map_err(|source| GuardError::LockError {
            path: self.lock_path.clone(),
            source,
        })?;

        let mut record = load_record(&self.state_path).unwrap_or_else(|err| {
            tracing::warn!(
                target: "hookguard::store",
                session = %self.key,
                error = %err,
                "state_load_failed_using_empty"
            );
            StateRecord::new()
        });
        let before = record.clone();
        let result = mutate(&mut record);
        if record != before {
            self.persist(&record)?;
        }
        drop(lock_file);
        Ok(result)
    }

    /// Fail-open update: returns `None` and leaves the file untouched on error.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut StateRecord) -> R) -> Option<R> {
        match self.try_update(mutate) {
            Ok(result) => Some(result),
            Err(err) => {
                tracing::warn!(
                    target: "hookguard::store",
                    session = %self.key,
                    error = %err,
                    "state_update_failed"
                );
                None
            }
        }
    }

    fn persist(&self, record: &StateRecord) -> Result<(), GuardError> {
        let dir = self
            .state_path
            .parent()
            .ok_or_else(|| {
                GuardError::PathError(format!("{} has no parent", self.state_path.display()))
            })?;
        let mut temp = NamedTempFile::new_in(dir)?;
        let body = serde_json::to_vec_pretty(record)?;
        temp.write_all(&body)?;
        temp.flush()?;
        temp.persist(&self.state_path)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<StateValue> {
        self.read().remove(key)
    }

    /// Sets one key, leaving all others intact.
    pub fn set(&self, key: &str, value: impl Into<StateValue>) {
        let value = value.into();
        self.update(|record| record.insert(key, value));
    }

    pub fn remove(&self, key: &str) {
        self.update(|record| {
            record.remove(key);
        });
    }

    /// Drops every key in the record.
    pub fn clear(&self) {
        self.update(StateRecord::clear);
    }
}

fn load_record(path: &Path) -> Result<StateRecord, GuardError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(StateRecord::new()),
        Err(err) => return Err(GuardError::IoError(err)),
    };
    match serde_json::from_str::<StateRecord>(&content) {
        Ok(record) => Ok(record),
        Err(err) => {
            tracing::warn!(
                target: "hookguard::store",
                path = %path.display(),
                error = %err,
                "state_file_malformed_discarded"
            );
            Ok(StateRecord::new())
        }
    }
}
