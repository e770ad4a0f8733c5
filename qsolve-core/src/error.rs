//! Error type shared across the workspace.

use thiserror::Error;

/// Errors surfaced by the solver and the quantifier engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QsolveError {
    /// The cancellation flag was raised; partial state is discarded.
    #[error("canceled")]
    Canceled,
    /// A kernel gave up; the payload is its diagnostic string.
    #[error("unknown: {0}")]
    Unknown(String),
    /// The input uses a construct outside the supported fragment.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, QsolveError>;
