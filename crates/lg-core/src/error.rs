//! Error types for LoudGraph

use thiserror::Error;

/// Core error type
///
/// The measurement and query paths are deliberately infallible (silence and
/// out-of-range queries degrade to sentinel values / empty results); errors
/// only surface from lifecycle plumbing such as feed-thread spawning.
#[derive(Error, Debug)]
pub enum LgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),
}

/// Result type alias
pub type LgResult<T> = Result<T, LgError>;
