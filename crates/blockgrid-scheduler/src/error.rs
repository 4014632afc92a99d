//! Scheduler error types.

use thiserror::Error;

use blockgrid_placement::PlacementError;

/// Errors returned to the caller of a scheduling decision.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A requested or configured strategy name is not registered.
    #[error("configuration error: {0}")]
    Configuration(#[from] PlacementError),

    /// No candidate survived the filters.
    #[error("no valid host was found: {reason}")]
    NoValidHost { reason: String },

    #[error("exceeded max scheduling attempts {max} (request is on attempt {attempts})")]
    MaxAttemptsExceeded { attempts: u32, max: u32 },
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
