//! Per-backend resource snapshot.
//!
//! A `HostState` is synthesized from the latest capability report and the
//! liveness directory's service record for one backend. Numeric fields
//! only move with newer reports; local consumption between reports is a
//! hint that the next report overwrites.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use blockgrid_core::{Capabilities, CapacityValue, DEFAULT_AVAILABILITY_ZONE, ServiceRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct HostState {
    /// Backend identity, e.g. `array1@pool-a`.
    pub host: String,
    /// Report that produced the numeric fields below.
    pub capabilities: Arc<Capabilities>,
    /// Last-known service record from the liveness directory.
    pub service: Option<ServiceRecord>,
    pub total_capacity_gb: CapacityValue,
    pub free_capacity_gb: CapacityValue,
    pub allocated_capacity_gb: f64,
    pub reserved_percentage: f64,
    /// Timestamp of the report behind the current numeric fields.
    pub updated_at: Option<DateTime<Utc>>,
    pub backend_name: Option<String>,
    pub vendor_name: Option<String>,
    pub driver_version: Option<String>,
    pub storage_protocol: Option<String>,
    pub qos_support: bool,
}

impl HostState {
    /// A host seen for the first time; capacity is unknown until a report lands.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            capabilities: Arc::new(Capabilities::default()),
            service: None,
            total_capacity_gb: CapacityValue::Unknown,
            free_capacity_gb: CapacityValue::Unknown,
            allocated_capacity_gb: 0.0,
            reserved_percentage: 0.0,
            updated_at: None,
            backend_name: None,
            vendor_name: None,
            driver_version: None,
            storage_protocol: None,
            qos_support: false,
        }
    }

    /// Apply a capability report.
    ///
    /// Reports not newer than `updated_at` are ignored. Returns whether the
    /// report was applied.
    pub fn update_from_capabilities(
        &mut self,
        capabilities: Arc<Capabilities>,
        timestamp: DateTime<Utc>,
    ) -> bool {
        if self.updated_at.is_some_and(|current| timestamp <= current) {
            debug!(host = %self.host, %timestamp, "report not newer than host state, ignored");
            return false;
        }

        self.total_capacity_gb = capabilities.total_capacity_gb;
        self.free_capacity_gb = capabilities.free_capacity_gb;
        self.allocated_capacity_gb = capabilities.allocated_capacity_gb;
        self.reserved_percentage = capabilities.reserved_percentage.clamp(0.0, 100.0);
        self.backend_name = capabilities.volume_backend_name.clone();
        self.vendor_name = capabilities.vendor_name.clone();
        self.driver_version = capabilities.driver_version.clone();
        self.storage_protocol = capabilities.storage_protocol.clone();
        self.qos_support = capabilities.qos_support;
        self.capabilities = capabilities;
        self.updated_at = Some(timestamp);
        true
    }

    pub fn update_service(&mut self, service: ServiceRecord) {
        self.service = Some(service);
    }

    /// Account for a volume placed here since the last report.
    ///
    /// Sentinel free capacity is left as is. `updated_at` does not move,
    /// so the next report replaces the decremented figure.
    pub fn consume_from_volume(&mut self, size_gb: f64) {
        if let CapacityValue::Finite(free) = self.free_capacity_gb {
            self.free_capacity_gb = CapacityValue::Finite(free - size_gb);
        }
        self.allocated_capacity_gb += size_gb;
    }

    /// Free capacity after the reserved share is held back, rounded down
    /// to whole gigabytes.
    ///
    /// `None` for sentinel values.
    pub fn usable_free_capacity_gb(&self) -> Option<f64> {
        self.free_capacity_gb
            .as_finite()
            .map(|free| self.reserve_adjusted(free))
    }

    /// `free` minus this host's reserved share, rounded down.
    pub fn reserve_adjusted(&self, free: f64) -> f64 {
        (free * (100.0 - self.reserved_percentage) / 100.0).floor()
    }

    pub fn availability_zone(&self) -> &str {
        self.service
            .as_ref()
            .map(|s| s.availability_zone.as_str())
            .unwrap_or(DEFAULT_AVAILABILITY_ZONE)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn caps(free: CapacityValue, reserved: f64) -> Arc<Capabilities> {
        Arc::new(Capabilities {
            total_capacity_gb: CapacityValue::Finite(2048.0),
            free_capacity_gb: free,
            reserved_percentage: reserved,
            volume_backend_name: Some("pool-a".to_string()),
            vendor_name: Some("Acme".to_string()),
            driver_version: Some("1.0".to_string()),
            storage_protocol: Some("iSCSI".to_string()),
            qos_support: true,
            ..Default::default()
        })
    }

    #[test]
    fn report_populates_derived_fields() {
        let mut state = HostState::new("h1");
        assert!(state.update_from_capabilities(caps(CapacityValue::Finite(1024.0), 10.0), ts(0)));

        assert_eq!(state.free_capacity_gb, CapacityValue::Finite(1024.0));
        assert_eq!(state.backend_name.as_deref(), Some("pool-a"));
        assert_eq!(state.storage_protocol.as_deref(), Some("iSCSI"));
        assert!(state.qos_support);
        assert_eq!(state.updated_at, Some(ts(0)));
        assert_eq!(state.usable_free_capacity_gb(), Some(921.0));
    }

    #[test]
    fn older_or_equal_report_is_ignored() {
        let mut state = HostState::new("h1");
        state.update_from_capabilities(caps(CapacityValue::Finite(500.0), 0.0), ts(10));
        let before = state.clone();

        assert!(!state.update_from_capabilities(caps(CapacityValue::Finite(100.0), 0.0), ts(5)));
        assert!(!state.update_from_capabilities(caps(CapacityValue::Finite(100.0), 0.0), ts(10)));
        assert_eq!(state, before);
    }

    #[test]
    fn consume_is_overwritten_by_next_report() {
        let mut state = HostState::new("h1");
        state.update_from_capabilities(caps(CapacityValue::Finite(500.0), 0.0), ts(0));

        state.consume_from_volume(100.0);
        assert_eq!(state.free_capacity_gb, CapacityValue::Finite(400.0));
        assert_eq!(state.allocated_capacity_gb, 100.0);
        assert_eq!(state.updated_at, Some(ts(0)));

        state.update_from_capabilities(caps(CapacityValue::Finite(480.0), 0.0), ts(1));
        assert_eq!(state.free_capacity_gb, CapacityValue::Finite(480.0));
        assert_eq!(state.allocated_capacity_gb, 0.0);
    }

    #[test]
    fn consume_leaves_sentinels_alone() {
        let mut state = HostState::new("h1");
        state.update_from_capabilities(caps(CapacityValue::Infinite, 0.0), ts(0));
        state.consume_from_volume(100.0);
        assert_eq!(state.free_capacity_gb, CapacityValue::Infinite);
        assert_eq!(state.usable_free_capacity_gb(), None);
    }

    #[test]
    fn zone_defaults_without_service() {
        let state = HostState::new("h1");
        assert_eq!(state.availability_zone(), DEFAULT_AVAILABILITY_ZONE);
    }
}
