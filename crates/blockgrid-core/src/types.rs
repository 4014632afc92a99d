//! Shared types used across BlockGrid crates.
//!
//! These are the inbound wire shapes: capability reports from backends,
//! service records from the liveness directory, and per-request
//! scheduling properties.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Availability zone assumed when a service record does not carry one.
pub const DEFAULT_AVAILABILITY_ZONE: &str = "default";

/// Service name (topic) under which volume backends report.
pub const VOLUME_TOPIC: &str = "volume";

// ── Capacity ──────────────────────────────────────────────────────

/// A capacity figure as reported by a backend.
///
/// Backends that cannot bound or measure their capacity report the
/// strings `"infinite"` or `"unknown"` instead of a number.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawCapacity", into = "RawCapacity")]
pub enum CapacityValue {
    Finite(f64),
    Infinite,
    #[default]
    Unknown,
}

impl CapacityValue {
    /// The numeric value, if the backend reported one.
    pub fn as_finite(&self) -> Option<f64> {
        match self {
            CapacityValue::Finite(v) => Some(*v),
            CapacityValue::Infinite | CapacityValue::Unknown => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, CapacityValue::Finite(_))
    }
}

impl fmt::Display for CapacityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityValue::Finite(v) => write!(f, "{v}"),
            CapacityValue::Infinite => f.write_str("infinite"),
            CapacityValue::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawCapacity {
    Number(f64),
    Text(String),
}

impl From<RawCapacity> for CapacityValue {
    fn from(raw: RawCapacity) -> Self {
        match raw {
            RawCapacity::Number(v) if v.is_finite() => CapacityValue::Finite(v),
            RawCapacity::Number(_) => CapacityValue::Infinite,
            RawCapacity::Text(s) if s.eq_ignore_ascii_case("infinite") => CapacityValue::Infinite,
            // "unknown" and anything unparseable are treated alike.
            RawCapacity::Text(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => CapacityValue::Finite(v),
                _ => CapacityValue::Unknown,
            },
        }
    }
}

impl From<CapacityValue> for RawCapacity {
    fn from(value: CapacityValue) -> Self {
        match value {
            CapacityValue::Finite(v) => RawCapacity::Number(v),
            other => RawCapacity::Text(other.to_string()),
        }
    }
}

// ── Capability reports ────────────────────────────────────────────

/// A backend's self-described resource and feature snapshot.
///
/// Field names follow the report wire format; the snake_case spellings
/// used by older drivers are accepted as aliases. Anything not modelled
/// here is kept in `extras` for capability matching.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(rename = "totalCapacityGB", alias = "total_capacity_gb", default)]
    pub total_capacity_gb: CapacityValue,
    #[serde(rename = "freeCapacityGB", alias = "free_capacity_gb", default)]
    pub free_capacity_gb: CapacityValue,
    #[serde(rename = "allocatedCapacityGB", alias = "allocated_capacity_gb", default)]
    pub allocated_capacity_gb: f64,
    /// Share of capacity held back from scheduling, 0-100.
    #[serde(rename = "reservedPercentage", alias = "reserved_percentage", default)]
    pub reserved_percentage: f64,
    #[serde(rename = "volumeBackendName", alias = "volume_backend_name", default)]
    pub volume_backend_name: Option<String>,
    #[serde(rename = "vendorName", alias = "vendor_name", default)]
    pub vendor_name: Option<String>,
    #[serde(rename = "driverVersion", alias = "driver_version", default)]
    pub driver_version: Option<String>,
    #[serde(rename = "storageProtocol", alias = "storage_protocol", default)]
    pub storage_protocol: Option<String>,
    #[serde(rename = "QoSSupport", alias = "QoS_support", default)]
    pub qos_support: bool,
    /// Vendor-specific extras.
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Capabilities {
    /// Render a capability as the string form used by requirement matching.
    ///
    /// Booleans render as `True`/`False`. Returns `None` when the backend
    /// does not report the key.
    pub fn lookup(&self, key: &str) -> Option<String> {
        let known = match key {
            "totalCapacityGB" | "total_capacity_gb" => Some(self.total_capacity_gb.to_string()),
            "freeCapacityGB" | "free_capacity_gb" => Some(self.free_capacity_gb.to_string()),
            "allocatedCapacityGB" | "allocated_capacity_gb" => {
                Some(self.allocated_capacity_gb.to_string())
            }
            "reservedPercentage" | "reserved_percentage" => {
                Some(self.reserved_percentage.to_string())
            }
            "volumeBackendName" | "volume_backend_name" => return self.volume_backend_name.clone(),
            "vendorName" | "vendor_name" => return self.vendor_name.clone(),
            "driverVersion" | "driver_version" => return self.driver_version.clone(),
            "storageProtocol" | "storage_protocol" => return self.storage_protocol.clone(),
            "QoSSupport" | "QoS_support" => Some(render_bool(self.qos_support)),
            _ => None,
        };
        known.or_else(|| self.extras.get(key).and_then(render_value))
    }
}

fn render_bool(b: bool) -> String {
    if b { "True".to_string() } else { "False".to_string() }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(render_bool(*b)),
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A capability report as delivered by a backend heartbeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityReport {
    pub service_name: String,
    pub host: String,
    pub capabilities: Capabilities,
    pub timestamp: DateTime<Utc>,
}

// ── Liveness ──────────────────────────────────────────────────────

/// A service entry from the liveness directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub host: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_zone")]
    pub availability_zone: String,
    /// Administratively disabled services are never scheduled to.
    #[serde(default)]
    pub disabled: bool,
    pub last_heartbeat: DateTime<Utc>,
}

impl ServiceRecord {
    /// Whether the service heartbeated within `down_time` of `now`.
    pub fn is_up(&self, now: DateTime<Utc>, down_time: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_heartbeat) <= down_time
    }
}

fn default_topic() -> String {
    VOLUME_TOPIC.to_string()
}

fn default_zone() -> String {
    DEFAULT_AVAILABILITY_ZONE.to_string()
}

// ── Scheduling requests ───────────────────────────────────────────

/// One or more strategy names.
///
/// Accepts a bare string as well as a list. A bare string may carry
/// several comma-separated names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyNames {
    One(String),
    Many(Vec<String>),
}

impl StrategyNames {
    /// Normalize to a list of trimmed, non-empty names.
    pub fn to_vec(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            StrategyNames::One(s) => s.split(',').collect(),
            StrategyNames::Many(v) => v.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl From<&str> for StrategyNames {
    fn from(name: &str) -> Self {
        StrategyNames::One(name.to_string())
    }
}

impl From<Vec<String>> for StrategyNames {
    fn from(names: Vec<String>) -> Self {
        StrategyNames::Many(names)
    }
}

impl From<Vec<&str>> for StrategyNames {
    fn from(names: Vec<&str>) -> Self {
        StrategyNames::Many(names.into_iter().map(str::to_string).collect())
    }
}

/// Hosts already tried by earlier attempts of the same request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryInfo {
    pub num_attempts: u32,
    #[serde(default)]
    pub hosts: Vec<String>,
}

/// Request-scoped scheduling input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterProperties {
    #[serde(rename = "sizeGB")]
    pub size_gb: f64,
    #[serde(default)]
    pub availability_zone: Option<String>,
    /// Capability requirements, key → requirement expression.
    #[serde(default)]
    pub capability_requirements: BTreeMap<String, String>,
    #[serde(default)]
    pub filter_names: Option<StrategyNames>,
    #[serde(default)]
    pub weigher_names: Option<StrategyNames>,
    #[serde(default)]
    pub retry: Option<RetryInfo>,
}

impl FilterProperties {
    /// Properties for a plain request of `size_gb`.
    pub fn for_size(size_gb: f64) -> Self {
        Self {
            size_gb,
            ..Default::default()
        }
    }
}
