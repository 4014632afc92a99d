use blockgrid_core::FilterProperties;
use blockgrid_state::HostState;

use super::Weigher;
use crate::registry::Strategy;

/// Weighs hosts by unreserved free capacity.
///
/// A positive multiplier spreads volumes onto the emptiest backends; a
/// negative one packs them onto the fullest. A backend with sentinel free
/// capacity never outranks a finite one. With a negative multiplier it
/// scores +∞, which normalizes level with the emptiest finite backend, so
/// the two can tie.
pub struct CapacityWeigher {
    multiplier: f64,
}

impl CapacityWeigher {
    pub const NAME: &'static str = "CapacityWeigher";

    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }
}

impl Default for CapacityWeigher {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Strategy for CapacityWeigher {
    fn name(&self) -> &str {
        Self::NAME
    }
}

impl Weigher for CapacityWeigher {
    fn weigh(&self, host: &HostState, _props: &FilterProperties) -> f64 {
        match host.usable_free_capacity_gb() {
            Some(free) => free,
            None if self.multiplier > 0.0 => -1.0,
            None => f64::INFINITY,
        }
    }

    fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

/// Weighs hosts by capacity already allocated to volumes.
///
/// The default multiplier of -1.0 prefers the least-allocated backend.
pub struct AllocatedCapacityWeigher {
    multiplier: f64,
}

impl AllocatedCapacityWeigher {
    pub const NAME: &'static str = "AllocatedCapacityWeigher";

    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }
}

impl Default for AllocatedCapacityWeigher {
    fn default() -> Self {
        Self::new(-1.0)
    }
}

impl Strategy for AllocatedCapacityWeigher {
    fn name(&self) -> &str {
        Self::NAME
    }
}

impl Weigher for AllocatedCapacityWeigher {
    fn weigh(&self, host: &HostState, _props: &FilterProperties) -> f64 {
        host.allocated_capacity_gb
    }

    fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

#[cfg(test)]
mod tests {
    use blockgrid_core::CapacityValue;

    use super::*;
    use crate::filters::test_support::make_host;

    fn four_hosts() -> Vec<HostState> {
        vec![
            make_host("host1", CapacityValue::Finite(1024.0), 10.0),
            make_host("host2", CapacityValue::Finite(300.0), 10.0),
            make_host("host3", CapacityValue::Finite(512.0), 0.0),
            make_host("host4", CapacityValue::Finite(200.0), 5.0),
        ]
    }

    #[test]
    fn raw_scores_hold_back_reserved_share() {
        let weigher = CapacityWeigher::default();
        let props = FilterProperties::for_size(1.0);
        let scores: Vec<f64> = four_hosts().iter().map(|h| weigher.weigh(h, &props)).collect();
        assert_eq!(scores, vec![921.0, 270.0, 512.0, 190.0]);
    }

    #[test]
    fn effective_scores_follow_multiplier() {
        let props = FilterProperties::for_size(1.0);
        let hosts = four_hosts();
        let effective = |m: f64| -> Vec<f64> {
            let w = CapacityWeigher::new(m);
            hosts.iter().map(|h| w.weigh(h, &props) * w.multiplier()).collect()
        };

        let max = |v: Vec<f64>| v.into_iter().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(max(effective(1.0)), 921.0);
        assert_eq!(max(effective(-1.0)), -190.0);
        assert_eq!(max(effective(2.0)), 1842.0);
    }

    #[test]
    fn sentinels_score_worst_for_either_sign() {
        let props = FilterProperties::for_size(1.0);
        let host = make_host("h", CapacityValue::Infinite, 0.0);
        assert_eq!(CapacityWeigher::new(1.0).weigh(&host, &props), -1.0);
        assert_eq!(CapacityWeigher::new(-1.0).weigh(&host, &props), f64::INFINITY);
    }

    #[test]
    fn allocated_weigher_reads_allocation() {
        let mut host = make_host("h", CapacityValue::Finite(100.0), 0.0);
        host.consume_from_volume(30.0);
        let w = AllocatedCapacityWeigher::default();
        assert_eq!(w.weigh(&host, &FilterProperties::for_size(1.0)), 30.0);
        assert_eq!(w.multiplier(), -1.0);
    }
}
