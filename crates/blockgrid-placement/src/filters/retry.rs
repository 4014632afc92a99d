use tracing::debug;

use blockgrid_core::FilterProperties;
use blockgrid_state::HostState;

use super::Filter;
use crate::registry::Strategy;

/// Rejects hosts that an earlier attempt of the same request already tried.
pub struct RetryFilter;

impl Strategy for RetryFilter {
    fn name(&self) -> &str {
        "RetryFilter"
    }
}

impl Filter for RetryFilter {
    fn passes(&self, host: &HostState, props: &FilterProperties) -> bool {
        let Some(retry) = &props.retry else {
            return true;
        };
        let tried = retry.hosts.iter().any(|h| *h == host.host);
        if tried {
            debug!(host = %host.host, attempts = retry.num_attempts, "host already tried");
        }
        !tried
    }
}
