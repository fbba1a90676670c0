//! Runtime configuration.
//!
//! Guards are launched by a host process with no flags of their own, so
//! configuration comes from the environment and an optional TOML file:
//! - `HOOKGUARD_CONFIG` names the file explicitly
//! - otherwise `<state_dir>/hookguard.toml` is used when present
//! - `HOOKGUARD_STATE_DIR` overrides `state_dir` in either case

use crate::core::error::GuardError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "HOOKGUARD_CONFIG";
pub const STATE_DIR_ENV: &str = "HOOKGUARD_STATE_DIR";
pub const CONFIG_FILE_NAME: &str = "hookguard.toml";

const DEFAULT_FILE_PREFIX: &str = "hookguard-session";
const DEFAULT_RUN_ONCE_TTL_MS: u64 = 2_000;
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Directory holding session state and lock files.
    pub state_dir: PathBuf,
    /// Base name prefix for state files.
    pub file_prefix: String,
    /// Window in which a repeated run-once claim is treated as a duplicate.
    pub run_once_ttl_ms: u64,
    /// Keys cleared on a session boundary in addition to the built-in flags.
    pub extra_session_flags: Vec<String>,
    /// Branches whose pushes require repeat-to-confirm.
    pub protected_branches: Vec<String>,
    /// Default `tracing` filter when `HOOKGUARD_LOG` is unset.
    pub log_filter: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            state_dir: std::env::temp_dir(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            run_once_ttl_ms: DEFAULT_RUN_ONCE_TTL_MS,
            extra_session_flags: Vec::new(),
            protected_branches: vec![
                "main".to_string(),
                "master".to_string(),
                "develop".to_string(),
            ],
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl GuardConfig {
    /// Config rooted at an explicit state directory, everything else default.
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            ..Self::default()
        }
    }

    pub fn run_once_ttl(&self) -> Duration {
        Duration::from_millis(self.run_once_ttl_ms)
    }

    /// Loads configuration from the environment.
    pub fn load() -> Result<Self, GuardError> {
        let state_dir_override = std::env::var_os(STATE_DIR_ENV).map(PathBuf::from);
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load_from(explicit.as_deref(), state_dir_override)
    }

    /// Resolves configuration given an optional explicit file and an optional
    /// state directory override.
    pub fn load_from(
        explicit: Option<&Path>,
        state_dir_override: Option<PathBuf>,
    ) -> Result<Self, GuardError> {
        let implicit_dir = state_dir_override
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let candidate = implicit_dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        if let Some(dir) = state_dir_override {
            config.state_dir = dir;
        }
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, GuardError> {
        let content = fs::read_to_string(path).map_err(GuardError::IoError)?;
        toml::from_str(&content)
            .map_err(|e| GuardError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    fn validate(&self) -> Result<(), GuardError> {
        if self.file_prefix.trim().is_empty() {
            return Err(GuardError::ConfigError(
                "file_prefix cannot be empty".to_string(),
            ));
        }
        if self
            .file_prefix
            .contains(|c: char| c == '/' || c == '\\' || c == '\0')
        {
            return Err(GuardError::ConfigError(format!(
                "file_prefix '{}' must not contain path separators",
                self.file_prefix
            )));
        }
        if self.state_dir.as_os_str().is_empty() {
            return Err(GuardError::ConfigError(
                "state_dir cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
