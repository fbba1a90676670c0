//! Session identity and session-boundary detection.
//!
//! A session's storage key comes from the working directory, so guards started
//! from the same project share state and parallel projects stay isolated. The
//! host's own logical session id arrives per invocation in the hook input and
//! is used only to notice that a new conversation began.

use crate::core::config::GuardConfig;
use crate::core::error::GuardError;
use crate::core::store::SessionStore;
use crate::core::value::StateValue;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Key holding the last logical session id seen for this store.
pub const LOGICAL_SESSION_KEY: &str = "logical_session_id";

/// Keys that only make sense within one logical session.
pub const DEFAULT_SESSION_FLAGS: &[&str] =
    &["active_contexts", "pending_confirmations", "hooks_active"];

const SESSION_KEY_PREFIX: &str = "state-";
const SESSION_KEY_HEX_LEN: usize = 16;

/// Derives the storage key for a working directory.
pub fn derive_session_key(working_directory: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(working_directory.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}{}", SESSION_KEY_PREFIX, &digest[..SESSION_KEY_HEX_LEN])
}

/// Opens the store for `working_directory`.
pub fn open_session(
    config: &GuardConfig,
    working_directory: &Path,
) -> Result<SessionStore, GuardError> {
    SessionStore::locate(config, &derive_session_key(working_directory))
}

/// Opens the store for the process's current directory.
pub fn open_current_session(config: &GuardConfig) -> Result<SessionStore, GuardError> {
    let cwd = std::env::current_dir()?;
    open_session(config, &cwd)
}

/// The fixed list of keys reset on a session boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFlags {
    keys: Vec<String>,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            keys: DEFAULT_SESSION_FLAGS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl SessionFlags {
    /// Built-in flags plus any configured extras.
    pub fn from_config(config: &GuardConfig) -> Self {
        let mut flags = Self::default();
        for extra in &config.extra_session_flags {
            if !flags.keys.contains(extra) && extra != LOGICAL_SESSION_KEY {
                flags.keys.push(extra.clone());
            }
        }
        flags
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// Compares `logical_session_id` with the persisted one.
///
/// On mismatch every session flag is cleared, the new id is stored and `true`
/// is returned. On match nothing is written and `false` is returned.
pub fn try_detect_session_boundary(
    store: &SessionStore,
    flags: &SessionFlags,
    logical_session_id: &str,
) -> Result<bool, GuardError> {
    store.try_update(|record| {
        let previous = record.get(LOGICAL_SESSION_KEY).and_then(StateValue::as_str);
        if previous == Some(logical_session_id) {
            return false;
        }
        for key in flags.keys() {
            record.remove(key);
        }
        record.insert(LOGICAL_SESSION_KEY, logical_session_id);
        true
    })
}

/// Fail-open boundary check: a broken store reports "continuing".
pub fn detect_session_boundary(
    store: &SessionStore,
    flags: &SessionFlags,
    logical_session_id: &str,
) -> bool {
    match try_detect_session_boundary(store, flags, logical_session_id) {
        Ok(is_new) => {
            if is_new {
                tracing::info!(
                    target: "hookguard::session",
                    session = %store.key(),
                    logical_session_id,
                    "session_boundary_detected"
                );
            }
            is_new
        }
        Err(err) => {
            tracing::warn!(
                target: "hookguard::session",
                session = %store.key(),
                error = %err,
                "session_boundary_check_failed"
            );
            false
        }
    }
}

/// Clears the session flags without touching the stored logical session id.
pub fn reset_session_flags(store: &SessionStore, flags: &SessionFlags) {
    store.update(|record| {
        for key in flags.keys() {
            record.remove(key);
        }
    });
}
