use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Failed to lock {path}: {source}")]
    LockError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to persist state file: {0}")]
    PersistError(#[from] tempfile::PersistError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Path error: {0}")]
    PathError(String),
}
