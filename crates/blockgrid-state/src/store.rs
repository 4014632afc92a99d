//! CapabilityStore: latest capability report and host state per backend.
//!
//! A single mutex guards both maps. Ingestion replaces a host's report
//! wholesale; `snapshot` merges reports into host states and hands out
//! clones, so readers never hold a reference into the shared maps.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use blockgrid_core::{Capabilities, CapabilityReport, ServiceRecord, VOLUME_TOPIC};

use crate::error::{StateError, StateResult};
use crate::host_state::HostState;

/// Latest report stored for one host.
#[derive(Debug, Clone)]
struct CapabilityEntry {
    capabilities: Arc<Capabilities>,
    /// Timestamp the backend put on the report.
    timestamp: DateTime<Utc>,
    /// When this process ingested it.
    received_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreInner {
    capabilities: HashMap<String, CapabilityEntry>,
    host_states: HashMap<String, HostState>,
}

/// Concurrency-safe map of backend → capabilities and host state.
///
/// `Clone` shares the underlying maps.
#[derive(Clone)]
pub struct CapabilityStore {
    inner: Arc<Mutex<StoreInner>>,
    volume_topic: String,
    service_down_time: chrono::Duration,
}

impl CapabilityStore {
    pub fn new(volume_topic: impl Into<String>, service_down_time: chrono::Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
            volume_topic: volume_topic.into(),
            service_down_time,
        }
    }

    pub fn volume_topic(&self) -> &str {
        &self.volume_topic
    }

    /// Record a backend's capabilities.
    ///
    /// Reports from services other than the volume topic share the
    /// transport and are dropped silently. A report no newer than the one
    /// already stored is dropped too. Returns whether the report was kept.
    pub async fn update_capabilities(
        &self,
        service_name: &str,
        host: &str,
        capabilities: Capabilities,
        timestamp: DateTime<Utc>,
    ) -> bool {
        if service_name != self.volume_topic {
            debug!(%service_name, %host, "ignoring capabilities from non-volume service");
            return false;
        }

        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.capabilities.get(host) {
            if timestamp <= existing.timestamp {
                debug!(
                    %host,
                    %timestamp,
                    stored = %existing.timestamp,
                    "discarding out-of-order capability report"
                );
                return false;
            }
        }

        inner.capabilities.insert(
            host.to_string(),
            CapabilityEntry {
                capabilities: Arc::new(capabilities),
                timestamp,
                received_at: Utc::now(),
            },
        );
        debug!(%host, %timestamp, "capabilities updated");
        true
    }

    /// Ingest a decoded capability report.
    pub async fn ingest(&self, report: CapabilityReport) -> StateResult<bool> {
        if report.host.trim().is_empty() {
            return Err(StateError::EmptyHost);
        }
        Ok(self
            .update_capabilities(
                &report.service_name,
                &report.host,
                report.capabilities,
                report.timestamp,
            )
            .await)
    }

    /// Decode and ingest a JSON capability report.
    pub async fn ingest_json(&self, payload: &[u8]) -> StateResult<bool> {
        let report: CapabilityReport = serde_json::from_slice(payload)
            .map_err(|e| StateError::InvalidReport(e.to_string()))?;
        self.ingest(report).await
    }

    /// Build the candidate host list for one scheduling decision.
    ///
    /// `services` is the liveness directory's listing. Hosts whose service
    /// is disabled, down, or has never reported are left out. Host state
    /// for services that are no longer usable is forgotten, and so are their
    /// reports once older than the service down time. The result is
    /// in listing order and owns its data.
    pub async fn snapshot(&self, services: &[ServiceRecord], now: DateTime<Utc>) -> Vec<HostState> {
        let mut inner = self.inner.lock().await;
        let StoreInner {
            capabilities,
            host_states,
        } = &mut *inner;

        let mut active: HashSet<&str> = HashSet::new();
        let mut snapshot = Vec::with_capacity(services.len());

        for service in services {
            let host = service.host.as_str();
            if service.topic != self.volume_topic {
                continue;
            }
            if active.contains(host) {
                debug!(%host, "duplicate service record, keeping the first");
                continue;
            }
            if service.disabled {
                info!(%host, "service disabled, excluding host");
                continue;
            }
            if !service.is_up(now, self.service_down_time) {
                warn!(%host, last_heartbeat = %service.last_heartbeat, "service is down, excluding host");
                continue;
            }
            let Some(entry) = capabilities.get(host) else {
                warn!(%host, "no capability report from host yet, excluding");
                continue;
            };

            let state = host_states.entry(host.to_string()).or_insert_with(|| {
                debug!(%host, "tracking new host");
                HostState::new(host)
            });
            if state.update_from_capabilities(entry.capabilities.clone(), entry.timestamp) {
                debug!(
                    %host,
                    report_age_ms = (now - entry.received_at).num_milliseconds(),
                    "host state refreshed from report"
                );
            }
            state.update_service(service.clone());

            active.insert(host);
            snapshot.push(state.clone());
        }

        host_states.retain(|host, _| {
            let keep = active.contains(host.as_str());
            if !keep {
                info!(%host, "removing inactive host from host state map");
            }
            keep
        });
        // Reports from inactive hosts live for one down-time window after
        // ingestion.
        capabilities.retain(|host, entry| {
            let keep = active.contains(host.as_str())
                || now.signed_duration_since(entry.received_at) <= self.service_down_time;
            if !keep {
                debug!(%host, "dropping stale report from inactive host");
            }
            keep
        });

        snapshot
    }

    /// Apply a placement to the stored host state ahead of the next report.
    ///
    /// Returns `false` if the host is not tracked.
    pub async fn consume(&self, host: &str, size_gb: f64) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.host_states.get_mut(host) {
            Some(state) => {
                state.consume_from_volume(size_gb);
                debug!(%host, size_gb, free = %state.free_capacity_gb, "capacity consumed");
                true
            }
            None => {
                warn!(%host, "consume for untracked host");
                false
            }
        }
    }

    /// Hosts that have delivered at least one report.
    pub async fn reporting_hosts(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut hosts: Vec<String> = inner.capabilities.keys().cloned().collect();
        hosts.sort();
        hosts
    }

    /// The latest stored report for a host.
    pub async fn capabilities(&self, host: &str) -> Option<Arc<Capabilities>> {
        let inner = self.inner.lock().await;
        inner.capabilities.get(host).map(|e| e.capabilities.clone())
    }
}

impl Default for CapabilityStore {
    fn default() -> Self {
        Self::new(VOLUME_TOPIC, chrono::Duration::seconds(60))
    }
}
