//! Framework error type.
//!
//! Sub-crates define their own error enums and either convert into `HlError`
//! via `From` impls or stay separate.  Nothing in the event pipeline
//! propagates errors through the tick loop — handlers are best-effort and
//! recovery is per-actor.

use thiserror::Error;

use crate::Actor;

/// The top-level error type for `hl-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum HlError {
    #[error("actor {0} not found")]
    ActorNotFound(Actor),

    #[error("subzone node '{0}' not found")]
    NodeNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `hl-*` crates.
pub type HlResult<T> = Result<T, HlError>;
