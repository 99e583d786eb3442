//! Save-subsystem error type.

use thiserror::Error;

/// Errors produced by `hl-save`.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SaveResult<T> = Result<T, SaveError>;
