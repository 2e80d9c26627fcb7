//! Action error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors from running or saving extracted code
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Code run timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Failed to start interpreter '{interpreter}'")]
    Spawn {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
