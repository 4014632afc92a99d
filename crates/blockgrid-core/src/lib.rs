//! blockgrid-core: shared wire types and configuration.

pub mod config;
pub mod types;

pub use config::SchedulerConfig;
pub use types::*;
