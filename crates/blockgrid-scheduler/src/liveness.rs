//! Liveness directory: which backends run a volume service, and whether
//! they are up.
//!
//! The directory is an external collaborator. Implementations stream
//! records into a channel so that a caller with a deadline can keep
//! whatever arrived before the deadline passed.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use blockgrid_core::ServiceRecord;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ServiceDirectory: Send + Sync {
    /// Send every service registered under `topic` into `sink`.
    ///
    /// The future may be dropped before it completes; records already
    /// sent are still used.
    fn list_services<'a>(
        &'a self,
        topic: &'a str,
        sink: mpsc::UnboundedSender<ServiceRecord>,
    ) -> BoxFuture<'a, ()>;
}

/// List services under `topic`, waiting at most `timeout`.
///
/// Returns the records received and whether the listing completed.
pub async fn collect_services(
    directory: &dyn ServiceDirectory,
    topic: &str,
    timeout: Duration,
) -> (Vec<ServiceRecord>, bool) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let complete = tokio::time::timeout(timeout, directory.list_services(topic, tx))
        .await
        .is_ok();

    let mut services = Vec::new();
    while let Ok(record) = rx.try_recv() {
        services.push(record);
    }

    if !complete {
        warn!(
            %topic,
            received = services.len(),
            timeout_ms = timeout.as_millis() as u64,
            "liveness directory timed out, using partial listing"
        );
    }
    (services, complete)
}

/// In-process service directory fed by heartbeats.
///
/// `Clone` shares the underlying records.
#[derive(Clone, Default)]
pub struct StaticServiceDirectory {
    services: Arc<RwLock<Vec<ServiceRecord>>>,
}

impl StaticServiceDirectory {
    pub fn new(services: Vec<ServiceRecord>) -> Self {
        Self {
            services: Arc::new(RwLock::new(services)),
        }
    }

    /// Add a service, replacing any record for the same host and topic.
    pub async fn register(&self, record: ServiceRecord) {
        let mut services = self.services.write().await;
        services.retain(|s| !(s.host == record.host && s.topic == record.topic));
        info!(host = %record.host, topic = %record.topic, "service registered");
        services.push(record);
    }

    /// Record a heartbeat. Returns `false` for an unknown host.
    pub async fn heartbeat(&self, host: &str, at: DateTime<Utc>) -> bool {
        let mut services = self.services.write().await;
        let mut found = false;
        for service in services.iter_mut().filter(|s| s.host == host) {
            service.last_heartbeat = at;
            found = true;
        }
        if found {
            debug!(%host, "heartbeat received");
        } else {
            warn!(%host, "heartbeat from unknown host");
        }
        found
    }

    /// Administratively enable or disable a host's services.
    pub async fn set_disabled(&self, host: &str, disabled: bool) -> bool {
        let mut services = self.services.write().await;
        let mut found = false;
        for service in services.iter_mut().filter(|s| s.host == host) {
            service.disabled = disabled;
            found = true;
        }
        if found {
            info!(%host, disabled, "service state changed");
        }
        found
    }

    pub async fn remove(&self, host: &str) -> bool {
        let mut services = self.services.write().await;
        let before = services.len();
        services.retain(|s| s.host != host);
        services.len() != before
    }
}

impl ServiceDirectory for StaticServiceDirectory {
    fn list_services<'a>(
        &'a self,
        topic: &'a str,
        sink: mpsc::UnboundedSender<ServiceRecord>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let services = self.services.read().await;
            for service in services.iter().filter(|s| s.topic == topic) {
                if sink.send(service.clone()).is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use blockgrid_core::{DEFAULT_AVAILABILITY_ZONE, VOLUME_TOPIC};

    use super::*;

    fn make_service(host: &str, topic: &str) -> ServiceRecord {
        ServiceRecord {
            host: host.to_string(),
            topic: topic.to_string(),
            availability_zone: DEFAULT_AVAILABILITY_ZONE.to_string(),
            disabled: false,
            last_heartbeat: Utc::now(),
        }
    }

    /// Sends one record, then never finishes.
    struct StalledDirectory;

    impl ServiceDirectory for StalledDirectory {
        fn list_services<'a>(
            &'a self,
            topic: &'a str,
            sink: mpsc::UnboundedSender<ServiceRecord>,
        ) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                let _ = sink.send(make_service("fast", topic));
                std::future::pending::<()>().await;
            })
        }
    }

    #[tokio::test]
    async fn lists_only_requested_topic() {
        let dir = StaticServiceDirectory::new(vec![
            make_service("h1", VOLUME_TOPIC),
            make_service("h2", "backup"),
        ]);
        let (services, complete) =
            collect_services(&dir, VOLUME_TOPIC, Duration::from_secs(1)).await;
        assert!(complete);
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].host, "h1");
    }

    #[tokio::test]
    async fn timeout_keeps_partial_listing() {
        let (services, complete) =
            collect_services(&StalledDirectory, VOLUME_TOPIC, Duration::from_millis(20)).await;
        assert!(!complete);
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].host, "fast");
    }

    #[tokio::test]
    async fn register_replaces_and_heartbeat_updates() {
        let dir = StaticServiceDirectory::default();
        let mut old = make_service("h1", VOLUME_TOPIC);
        old.last_heartbeat = Utc::now() - chrono::Duration::hours(1);
        dir.register(old).await;
        dir.register(make_service("h1", VOLUME_TOPIC)).await;

        let later = Utc::now() + chrono::Duration::seconds(5);
        assert!(dir.heartbeat("h1", later).await);
        assert!(!dir.heartbeat("nope", later).await);

        let (services, _) = collect_services(&dir, VOLUME_TOPIC, Duration::from_secs(1)).await;
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].last_heartbeat, later);

        assert!(dir.set_disabled("h1", true).await);
        let (services, _) = collect_services(&dir, VOLUME_TOPIC, Duration::from_secs(1)).await;
        assert!(services[0].disabled);

        assert!(dir.remove("h1").await);
        assert!(!dir.remove("h1").await);
    }
}
