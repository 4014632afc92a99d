//! Scheduler configuration (`blockgrid.toml`).
//!
//! All settings are static for the life of the process. Every key is
//! optional; missing keys take the defaults below.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{StrategyNames, VOLUME_TOPIC};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// The only service name whose reports and services are considered.
    pub volume_topic: String,
    /// Filters applied when a request names none.
    pub default_filters: StrategyNames,
    /// Weighers applied when a request names none.
    pub default_weighers: StrategyNames,
    pub capacity_weight_multiplier: f64,
    pub allocated_capacity_weight_multiplier: f64,
    /// Multiplier overrides for any registered weigher, by name.
    pub weigher_multipliers: HashMap<String, f64>,
    /// A service silent for longer than this is considered down.
    pub service_down_time_secs: u64,
    /// How long one scheduling call waits on the liveness directory.
    pub liveness_timeout_ms: u64,
    /// Highest `retry.numAttempts` a request may carry.
    pub max_attempts: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            volume_topic: VOLUME_TOPIC.to_string(),
            default_filters: StrategyNames::from(vec![
                "AvailabilityZoneFilter",
                "CapacityFilter",
                "CapabilitiesFilter",
                "RetryFilter",
            ]),
            default_weighers: StrategyNames::from(vec!["CapacityWeigher"]),
            capacity_weight_multiplier: 1.0,
            allocated_capacity_weight_multiplier: -1.0,
            weigher_multipliers: HashMap::new(),
            service_down_time_secs: 60,
            liveness_timeout_ms: 1000,
            max_attempts: 3,
        }
    }
}

impl SchedulerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: SchedulerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.volume_topic.trim().is_empty() {
            anyhow::bail!("volume_topic must not be empty");
        }
        if self.service_down_time_secs == 0 {
            anyhow::bail!("service_down_time_secs must be positive");
        }
        if self.liveness_timeout_ms == 0 {
            anyhow::bail!("liveness_timeout_ms must be positive");
        }
        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        let dedicated = [
            ("capacity_weight_multiplier", self.capacity_weight_multiplier),
            (
                "allocated_capacity_weight_multiplier",
                self.allocated_capacity_weight_multiplier,
            ),
        ];
        if let Some((name, _)) = dedicated.iter().find(|(_, m)| !m.is_finite()) {
            anyhow::bail!("{name} must be a finite number");
        }
        if let Some((name, _)) = self
            .weigher_multipliers
            .iter()
            .find(|(_, m)| !m.is_finite())
        {
            anyhow::bail!("multiplier for {name} must be a finite number");
        }
        Ok(())
    }

    pub fn service_down_time(&self) -> chrono::Duration {
        i64::try_from(self.service_down_time_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    /// Effective multiplier for a weigher: explicit override, then the
    /// dedicated setting, then `fallback`.
    pub fn multiplier_for(&self, weigher: &str, fallback: f64) -> f64 {
        if let Some(m) = self.weigher_multipliers.get(weigher) {
            return *m;
        }
        match weigher {
            "CapacityWeigher" => self.capacity_weight_multiplier,
            "AllocatedCapacityWeigher" => self.allocated_capacity_weight_multiplier,
            _ => fallback,
        }
    }
}
