//! Error types for the BlockGrid capability store.

use thiserror::Error;

/// Result type alias for capability store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while ingesting capability reports.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("malformed capability report: {0}")]
    InvalidReport(String),

    #[error("capability report has an empty host")]
    EmptyHost,
}
