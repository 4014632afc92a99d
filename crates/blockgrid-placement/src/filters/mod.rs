//! Hard pass/fail predicates over candidate hosts.

mod availability_zone;
mod capabilities;
mod capacity;
pub mod requirement;
mod retry;

use std::sync::Arc;

use blockgrid_core::FilterProperties;
use blockgrid_state::HostState;

use crate::error::StrategyKind;
use crate::registry::{Strategy, StrategyRegistry};

pub use availability_zone::AvailabilityZoneFilter;
pub use capabilities::CapabilitiesFilter;
pub use capacity::CapacityFilter;
pub use retry::RetryFilter;

/// A filter must be a pure predicate: the same host and request always
/// give the same answer.
pub trait Filter: Strategy {
    fn passes(&self, host: &HostState, props: &FilterProperties) -> bool;
}

/// The filter catalog available to every scheduler.
pub fn builtin_filters() -> StrategyRegistry<dyn Filter> {
    StrategyRegistry::<dyn Filter>::new(StrategyKind::Filter)
        .with(Arc::new(AvailabilityZoneFilter))
        .with(Arc::new(CapacityFilter))
        .with(Arc::new(CapabilitiesFilter))
        .with(Arc::new(RetryFilter))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use blockgrid_core::{Capabilities, CapacityValue, ServiceRecord, VOLUME_TOPIC};
    use blockgrid_state::HostState;
    use chrono::{TimeZone, Utc};

    pub fn make_host(host: &str, free: CapacityValue, reserved: f64) -> HostState {
        let mut state = HostState::new(host);
        state.update_from_capabilities(
            Arc::new(Capabilities {
                total_capacity_gb: CapacityValue::Finite(4096.0),
                free_capacity_gb: free,
                reserved_percentage: reserved,
                ..Default::default()
            }),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        );
        state
    }

    pub fn in_zone(mut host: HostState, zone: &str) -> HostState {
        host.update_service(ServiceRecord {
            host: host.host.clone(),
            topic: VOLUME_TOPIC.to_string(),
            availability_zone: zone.to_string(),
            disabled: false,
            last_heartbeat: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        });
        host
    }
}
