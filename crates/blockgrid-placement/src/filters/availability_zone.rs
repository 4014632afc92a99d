use blockgrid_core::FilterProperties;
use blockgrid_state::HostState;

use super::Filter;
use crate::registry::Strategy;

/// Passes hosts in the requested availability zone, or every host when
/// the request names none.
pub struct AvailabilityZoneFilter;

impl Strategy for AvailabilityZoneFilter {
    fn name(&self) -> &str {
        "AvailabilityZoneFilter"
    }
}

impl Filter for AvailabilityZoneFilter {
    fn passes(&self, host: &HostState, props: &FilterProperties) -> bool {
        match props.availability_zone.as_deref() {
            None => true,
            Some(zone) => host.availability_zone() == zone,
        }
    }
}
