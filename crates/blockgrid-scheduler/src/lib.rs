//! blockgrid-scheduler: placement decisions for volume-creation requests.
//!
//! For each request the scheduler takes a point-in-time snapshot of the
//! capability store, filters out backends that cannot take the volume,
//! and ranks the rest. It never retries on its own: a caller that wants
//! another attempt re-invokes it with the failed hosts in `retry.hosts`.
//!
//! # Architecture
//!
//! ```text
//! Scheduler
//!   ├── ServiceDirectory (liveness; bounded by liveness_timeout)
//!   ├── CapabilityStore  (snapshot → Vec<HostState>)
//!   ├── Filter catalog   → apply_filters
//!   └── Weigher catalog  → weigh_hosts → ranked hosts
//! ```

pub mod error;
pub mod liveness;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use liveness::{ServiceDirectory, StaticServiceDirectory, collect_services};
pub use scheduler::{ScheduledHost, Scheduler};
