//! blockgrid-placement: filter and weigher pipelines for backend selection.
//!
//! Given a snapshot of candidate hosts, this crate removes the hosts that
//! cannot take a request (filters) and ranks the rest (weighers). It does
//! NOT read capability reports or talk to the liveness directory (that's
//! `blockgrid-state` and `blockgrid-scheduler`).
//!
//! # Components
//!
//! - **`registry`**: name → strategy lookup over a fixed catalog
//! - **`filters`**: hard pass/fail predicates
//! - **`weighers`**: soft scores with signed multipliers
//! - **`pipeline`**: filter AND-composition, score normalization and ranking

pub mod error;
pub mod filters;
pub mod pipeline;
pub mod registry;
pub mod weighers;

pub use error::{PlacementError, PlacementResult, StrategyKind};
pub use filters::{
    AvailabilityZoneFilter, CapabilitiesFilter, CapacityFilter, Filter, RetryFilter,
    builtin_filters,
};
pub use pipeline::{WeighedHost, apply_filters, normalize, weigh_hosts};
pub use registry::{Strategy, StrategyRegistry};
pub use weighers::{AllocatedCapacityWeigher, CapacityWeigher, Weigher, builtin_weighers};
