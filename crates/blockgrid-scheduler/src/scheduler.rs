//! Scheduler: picks the backend that services a volume-creation request.
//!
//! One call is one decision:
//! - Resolve the request's filter and weigher names (or the defaults)
//! - Ask the liveness directory which volume services exist
//! - Snapshot the capability store for those services
//! - Filter, weigh, and return the ranked candidates
//!
//! No lock is held while filtering or weighing; both run over an owned
//! copy of the snapshot.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use blockgrid_core::{FilterProperties, SchedulerConfig};
use blockgrid_placement::{
    Filter, StrategyRegistry, WeighedHost, Weigher, apply_filters, builtin_filters,
    builtin_weighers, weigh_hosts,
};
use blockgrid_state::{CapabilityStore, HostState};

use crate::error::{SchedulerError, SchedulerResult};
use crate::liveness::{ServiceDirectory, collect_services};

/// One entry of a scheduling response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledHost {
    pub host: String,
    pub weight: f64,
}

impl From<&WeighedHost> for ScheduledHost {
    fn from(weighed: &WeighedHost) -> Self {
        Self {
            host: weighed.host().to_string(),
            weight: weighed.weight,
        }
    }
}

pub struct Scheduler {
    config: SchedulerConfig,
    store: CapabilityStore,
    directory: Arc<dyn ServiceDirectory>,
    filters: StrategyRegistry<dyn Filter>,
    weighers: StrategyRegistry<dyn Weigher>,
}

impl Scheduler {
    /// Create a scheduler over the built-in strategy catalogs.
    ///
    /// Fails if the configured default filter or weigher lists name an
    /// unregistered strategy.
    pub fn new(
        config: SchedulerConfig,
        store: CapabilityStore,
        directory: Arc<dyn ServiceDirectory>,
    ) -> SchedulerResult<Self> {
        let filters = builtin_filters();
        let weighers = builtin_weighers(&config);
        Self::with_catalogs(config, store, directory, filters, weighers)
    }

    /// Create a scheduler over caller-supplied catalogs.
    pub fn with_catalogs(
        config: SchedulerConfig,
        store: CapabilityStore,
        directory: Arc<dyn ServiceDirectory>,
        filters: StrategyRegistry<dyn Filter>,
        weighers: StrategyRegistry<dyn Weigher>,
    ) -> SchedulerResult<Self> {
        filters.resolve(&config.default_filters.to_vec())?;
        weighers.resolve(&config.default_weighers.to_vec())?;
        info!(
            filters = ?config.default_filters.to_vec(),
            weighers = ?config.default_weighers.to_vec(),
            "scheduler initialized"
        );

        Ok(Self {
            config,
            store,
            directory,
            filters,
            weighers,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn store(&self) -> &CapabilityStore {
        &self.store
    }

    /// Rank every viable host for `props`, best first.
    pub async fn rank_hosts(&self, props: &FilterProperties) -> SchedulerResult<Vec<WeighedHost>> {
        if let Some(retry) = &props.retry {
            if retry.num_attempts > self.config.max_attempts {
                return Err(SchedulerError::MaxAttemptsExceeded {
                    attempts: retry.num_attempts,
                    max: self.config.max_attempts,
                });
            }
        }

        let filters = self
            .filters
            .resolve_or_default(props.filter_names.as_ref(), &self.config.default_filters)?;
        let weighers = self
            .weighers
            .resolve_or_default(props.weigher_names.as_ref(), &self.config.default_weighers)?;

        let (services, _) = collect_services(
            self.directory.as_ref(),
            &self.config.volume_topic,
            self.config.liveness_timeout(),
        )
        .await;
        let candidates = self.store.snapshot(&services, Utc::now()).await;
        if candidates.is_empty() {
            warn!(services = services.len(), "no schedulable hosts in snapshot");
            return Err(SchedulerError::NoValidHost {
                reason: "no backends are up and reporting".to_string(),
            });
        }
        let total = candidates.len();

        let survivors = apply_filters(candidates, &filters, props);
        if survivors.is_empty() {
            warn!(candidates = total, size_gb = props.size_gb, "filters eliminated every host");
            return Err(SchedulerError::NoValidHost {
                reason: format!("all {total} candidate host(s) were filtered out"),
            });
        }
        debug!(candidates = total, survivors = survivors.len(), "filtering complete");

        Ok(weigh_hosts(survivors, &weighers, props))
    }

    /// The ranked response for `props`.
    pub async fn schedule(&self, props: &FilterProperties) -> SchedulerResult<Vec<ScheduledHost>> {
        let ranked = self.rank_hosts(props).await?;
        Ok(ranked.iter().map(ScheduledHost::from).collect())
    }

    /// Pick the best host for `props` and charge the volume against it.
    ///
    /// The charge is a hint until the host's next capability report.
    pub async fn select_host(&self, props: &FilterProperties) -> SchedulerResult<HostState> {
        let ranked = self.rank_hosts(props).await?;
        let Some(top) = ranked.into_iter().next() else {
            return Err(SchedulerError::NoValidHost {
                reason: "no host ranked".to_string(),
            });
        };

        self.store.consume(top.host(), props.size_gb).await;
        info!(host = %top.host(), weight = top.weight, size_gb = props.size_gb, "host selected");
        Ok(top.host_state)
    }
}

#[cfg(test)]
mod tests {
    use blockgrid_core::{
        Capabilities, CapacityValue, DEFAULT_AVAILABILITY_ZONE, RetryInfo, ServiceRecord,
        StrategyNames, VOLUME_TOPIC,
    };
    use blockgrid_placement::{PlacementError, StrategyKind};

    use super::*;
    use crate::liveness::StaticServiceDirectory;

    fn make_service(host: &str) -> ServiceRecord {
        ServiceRecord {
            host: host.to_string(),
            topic: VOLUME_TOPIC.to_string(),
            availability_zone: DEFAULT_AVAILABILITY_ZONE.to_string(),
            disabled: false,
            last_heartbeat: Utc::now(),
        }
    }

    fn make_caps(free: f64, reserved: f64) -> Capabilities {
        Capabilities {
            total_capacity_gb: CapacityValue::Finite(2048.0),
            free_capacity_gb: CapacityValue::Finite(free),
            reserved_percentage: reserved,
            ..Default::default()
        }
    }

    async fn test_scheduler(config: SchedulerConfig) -> Scheduler {
        let store = CapabilityStore::new(VOLUME_TOPIC, config.service_down_time());
        let hosts = [
            ("host1", 1024.0, 10.0),
            ("host2", 300.0, 10.0),
            ("host3", 512.0, 0.0),
            ("host4", 200.0, 5.0),
        ];
        for (host, free, reserved) in hosts {
            store
                .update_capabilities(VOLUME_TOPIC, host, make_caps(free, reserved), Utc::now())
                .await;
        }
        let directory = StaticServiceDirectory::new(hosts.iter().map(|h| make_service(h.0)).collect());
        Scheduler::new(config, store, Arc::new(directory)).unwrap()
    }

    #[tokio::test]
    async fn ranks_by_free_capacity() {
        let scheduler = test_scheduler(SchedulerConfig::default()).await;
        let ranked = scheduler.schedule(&FilterProperties::for_size(100.0)).await.unwrap();
        let hosts: Vec<&str> = ranked.iter().map(|h| h.host.as_str()).collect();
        assert_eq!(hosts, vec!["host1", "host3", "host2", "host4"]);
    }

    #[tokio::test]
    async fn negative_multiplier_from_config_packs() {
        let config = SchedulerConfig {
            capacity_weight_multiplier: -1.0,
            ..Default::default()
        };
        let scheduler = test_scheduler(config).await;
        let top = scheduler.select_host(&FilterProperties::for_size(100.0)).await.unwrap();
        assert_eq!(top.host, "host4");
    }

    #[tokio::test]
    async fn select_consumes_capacity() {
        let scheduler = test_scheduler(SchedulerConfig::default()).await;
        let props = FilterProperties::for_size(600.0);

        let first = scheduler.select_host(&props).await.unwrap();
        assert_eq!(first.host, "host1");

        // host1 now has 424 free (381 usable); nobody fits another 600.
        let err = scheduler.select_host(&props).await.unwrap_err();
        assert!(matches!(err, SchedulerError::NoValidHost { .. }));
    }

    #[tokio::test]
    async fn unknown_names_fail_before_filtering() {
        let scheduler = test_scheduler(SchedulerConfig::default()).await;
        let mut props = FilterProperties::for_size(1.0);
        props.filter_names = Some(StrategyNames::from(vec!["CapacityFilter", "NopeFilter", "Other"]));

        let err = scheduler.rank_hosts(&props).await.unwrap_err();
        match err {
            SchedulerError::Configuration(PlacementError::UnknownStrategies { kind, names }) => {
                assert_eq!(kind, StrategyKind::Filter);
                assert_eq!(names, vec!["NopeFilter", "Other"]);
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_weigher_is_configuration_error() {
        let scheduler = test_scheduler(SchedulerConfig::default()).await;
        let mut props = FilterProperties::for_size(1.0);
        props.weigher_names = Some(StrategyNames::from("RandomWeigher"));
        let err = scheduler.rank_hosts(&props).await.unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Configuration(PlacementError::UnknownStrategies {
                kind: StrategyKind::Weigher,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn bad_defaults_fail_at_construction() {
        let config = SchedulerConfig {
            default_filters: StrategyNames::from("CapacityFilter,Bogus"),
            ..Default::default()
        };
        let result = Scheduler::new(
            config,
            CapabilityStore::default(),
            Arc::new(StaticServiceDirectory::default()),
        );
        assert!(matches!(result, Err(SchedulerError::Configuration(_))));
    }

    #[tokio::test]
    async fn oversized_request_has_no_valid_host() {
        let scheduler = test_scheduler(SchedulerConfig::default()).await;
        let err = scheduler
            .select_host(&FilterProperties::for_size(5000.0))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::NoValidHost { .. }));
    }

    #[tokio::test]
    async fn empty_directory_has_no_valid_host() {
        let scheduler = Scheduler::new(
            SchedulerConfig::default(),
            CapabilityStore::default(),
            Arc::new(StaticServiceDirectory::default()),
        )
        .unwrap();
        let err = scheduler.rank_hosts(&FilterProperties::for_size(1.0)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::NoValidHost { .. }));
    }

    #[tokio::test]
    async fn retry_excludes_tried_hosts() {
        let scheduler = test_scheduler(SchedulerConfig::default()).await;
        let mut props = FilterProperties::for_size(100.0);
        props.retry = Some(RetryInfo {
            num_attempts: 1,
            hosts: vec!["host1".to_string()],
        });
        let top = scheduler.select_host(&props).await.unwrap();
        assert_eq!(top.host, "host3");
    }

    #[tokio::test]
    async fn too_many_attempts_is_rejected() {
        let scheduler = test_scheduler(SchedulerConfig::default()).await;
        let mut props = FilterProperties::for_size(1.0);
        props.retry = Some(RetryInfo {
            num_attempts: 4,
            hosts: vec![],
        });
        let err = scheduler.rank_hosts(&props).await.unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::MaxAttemptsExceeded { attempts: 4, max: 3 }
        ));
    }
}
