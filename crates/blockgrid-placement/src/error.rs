//! Placement error types.

use std::fmt;

use thiserror::Error;

pub type PlacementResult<T> = Result<T, PlacementError>;

/// Which strategy catalog a name was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Filter,
    Weigher,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Filter => f.write_str("filter"),
            StrategyKind::Weigher => f.write_str("weigher"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    /// One or more configured names have no registered strategy.
    #[error("unknown {kind} name(s): {}", .names.join(", "))]
    UnknownStrategies { kind: StrategyKind, names: Vec<String> },
}
