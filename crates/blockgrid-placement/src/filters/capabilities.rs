use tracing::debug;

use blockgrid_core::FilterProperties;
use blockgrid_state::HostState;

use super::Filter;
use super::requirement;
use crate::registry::Strategy;

/// Prefix that scopes a requirement key to host capabilities.
const CAPABILITIES_SCOPE: &str = "capabilities";

/// Passes hosts whose reported capabilities satisfy every requirement
/// in the request.
///
/// Keys may be written `capabilities:<key>`; keys under any other scope
/// belong to someone else and are skipped.
pub struct CapabilitiesFilter;

impl Strategy for CapabilitiesFilter {
    fn name(&self) -> &str {
        "CapabilitiesFilter"
    }
}

impl Filter for CapabilitiesFilter {
    fn passes(&self, host: &HostState, props: &FilterProperties) -> bool {
        for (key, req) in &props.capability_requirements {
            let key = match key.split_once(':') {
                Some((CAPABILITIES_SCOPE, rest)) => rest,
                Some(_) => continue,
                None => key.as_str(),
            };
            let value = host.capabilities.lookup(key);
            if !requirement::matches(value.as_deref(), req) {
                debug!(
                    host = %host.host,
                    capability = key,
                    requirement = %req,
                    reported = ?value,
                    "capability requirement not met"
                );
                return false;
            }
        }
        true
    }
}
