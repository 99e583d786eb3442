//! Graph-subsystem error type.

use thiserror::Error;

/// Errors produced by `hl-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("subzone node '{0}' not found")]
    NodeNotFound(String),

    #[error("graph description parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;
