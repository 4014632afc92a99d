//! Filter and weigh pipelines.
//!
//! Filters run in configured order, each over the survivors of the one
//! before. Weighers score every survivor; each weigher's raw scores are
//! min-max normalized to [0, 1], scaled by its multiplier, and summed per
//! host. Hosts are ranked by the sum, highest first, with ties kept in
//! input order.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use blockgrid_core::FilterProperties;
use blockgrid_state::HostState;

use crate::filters::Filter;
use crate::weighers::Weigher;

/// A candidate with its aggregate weight.
#[derive(Debug, Clone)]
pub struct WeighedHost {
    pub host_state: HostState,
    pub weight: f64,
}

impl WeighedHost {
    pub fn host(&self) -> &str {
        &self.host_state.host
    }
}

/// Keep the candidates that pass every filter.
pub fn apply_filters(
    mut candidates: Vec<HostState>,
    filters: &[Arc<dyn Filter>],
    props: &FilterProperties,
) -> Vec<HostState> {
    for filter in filters {
        if candidates.is_empty() {
            break;
        }
        let before = candidates.len();
        candidates.retain(|host| filter.passes(host, props));
        debug!(
            filter = filter.name(),
            before,
            remaining = candidates.len(),
            "filter applied"
        );
    }
    candidates
}

/// Min-max scale `values` into [0, 1].
///
/// When every value is equal the result is all zeros. Infinite values are
/// pinned to the ends (+∞ → 1, −∞ → 0) and do not stretch the range.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let Some(first) = values.first() else {
        return Vec::new();
    };
    if values.iter().all(|v| v == first) {
        return vec![0.0; values.len()];
    }

    let (min, max) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    values
        .iter()
        .map(|&v| {
            if v == f64::INFINITY {
                1.0
            } else if !v.is_finite() || !(range > 0.0) {
                0.0
            } else {
                (v - min) / range
            }
        })
        .collect()
}

/// Score and rank `candidates`, best first.
pub fn weigh_hosts(
    candidates: Vec<HostState>,
    weighers: &[Arc<dyn Weigher>],
    props: &FilterProperties,
) -> Vec<WeighedHost> {
    let mut totals = vec![0.0; candidates.len()];

    for weigher in weighers {
        let multiplier = weigher.multiplier();
        if multiplier == 0.0 {
            debug!(weigher = weigher.name(), "zero multiplier, skipped");
            continue;
        }
        let raw: Vec<f64> = candidates
            .iter()
            .map(|host| weigher.weigh(host, props))
            .collect();
        for (total, score) in totals.iter_mut().zip(normalize(&raw)) {
            *total += multiplier * score;
        }
        debug!(weigher = weigher.name(), multiplier, "weigher applied");
    }

    let mut weighed: Vec<WeighedHost> = candidates
        .into_iter()
        .zip(totals)
        .map(|(host_state, weight)| WeighedHost { host_state, weight })
        .collect();

    // Stable: equal weights keep input order.
    weighed.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
    weighed
}
