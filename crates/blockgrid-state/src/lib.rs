//! blockgrid-state: in-memory capability store for BlockGrid.
//!
//! Holds the latest capability report per backend and the `HostState`
//! synthesized from it. Reports arrive asynchronously from backend
//! heartbeats; scheduling decisions read point-in-time snapshots.
//!
//! # Architecture
//!
//! ```text
//! CapabilityStore (Clone, one mutex)
//!   ├── capabilities: host → latest report (replaced wholesale)
//!   └── host_states:  host → HostState (merged on snapshot)
//! ```
//!
//! Nothing is persisted: a restarted process rebuilds its view from the
//! next round of heartbeats.

pub mod error;
pub mod host_state;
pub mod store;

pub use error::{StateError, StateResult};
pub use host_state::HostState;
pub use store::CapabilityStore;
