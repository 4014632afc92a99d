//! Soft scoring functions over candidate hosts.
//!
//! A weigher produces a raw score per host. The pipeline normalizes raw
//! scores across the candidate set and scales them by the weigher's
//! multiplier, so only the relative order of raw scores matters.

mod capacity;

use std::sync::Arc;

use blockgrid_core::{FilterProperties, SchedulerConfig};
use blockgrid_state::HostState;

use crate::error::StrategyKind;
use crate::registry::{Strategy, StrategyRegistry};

pub use capacity::{AllocatedCapacityWeigher, CapacityWeigher};

pub trait Weigher: Strategy {
    /// Raw, unnormalized score. Higher means more preferred before the
    /// multiplier is applied.
    fn weigh(&self, host: &HostState, props: &FilterProperties) -> f64;

    /// Signed scale applied after normalization. Negative values invert
    /// the preference.
    fn multiplier(&self) -> f64;
}

/// The weigher catalog, with multipliers taken from `config`.
pub fn builtin_weighers(config: &SchedulerConfig) -> StrategyRegistry<dyn Weigher> {
    StrategyRegistry::<dyn Weigher>::new(StrategyKind::Weigher)
        .with(Arc::new(CapacityWeigher::new(
            config.multiplier_for(CapacityWeigher::NAME, 1.0),
        )))
        .with(Arc::new(AllocatedCapacityWeigher::new(
            config.multiplier_for(AllocatedCapacityWeigher::NAME, -1.0),
        )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_takes_multipliers_from_config() {
        let config = SchedulerConfig {
            capacity_weight_multiplier: -2.0,
            ..Default::default()
        };
        let catalog = builtin_weighers(&config);
        assert_eq!(catalog.get("CapacityWeigher").unwrap().multiplier(), -2.0);
        assert_eq!(
            catalog.get("AllocatedCapacityWeigher").unwrap().multiplier(),
            -1.0
        );
    }
}
