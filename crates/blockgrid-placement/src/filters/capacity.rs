use tracing::debug;

use blockgrid_core::{CapacityValue, FilterProperties};
use blockgrid_state::HostState;

use super::Filter;
use crate::registry::Strategy;

/// Passes hosts with enough unreserved free capacity for the request.
///
/// Backends reporting `infinite` or `unknown` free capacity always pass.
pub struct CapacityFilter;

impl Strategy for CapacityFilter {
    fn name(&self) -> &str {
        "CapacityFilter"
    }
}

impl Filter for CapacityFilter {
    fn passes(&self, host: &HostState, props: &FilterProperties) -> bool {
        let free = match host.free_capacity_gb {
            CapacityValue::Infinite | CapacityValue::Unknown => return true,
            CapacityValue::Finite(free) => free,
        };
        let usable = host.reserve_adjusted(free);
        if usable < props.size_gb {
            debug!(
                host = %host.host,
                requested = props.size_gb,
                usable,
                "insufficient free space for volume"
            );
            return false;
        }
        true
    }
}
