//! Periodic collection loop
//!
//! Runs one collection cycle per tick for a fixed set of namespaces and
//! forwards each successful batch over a channel. A failed cycle is
//! logged and recorded in the health registry; the next tick is the retry.

use super::VsphereCollector;
use crate::error::Result;
use crate::health::HealthRegistry;
use crate::models::CollectionBatch;
use crate::namespace::MetricRequest;
use crate::observability::StructuredLogger;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Base collection interval (default: 60 seconds)
    pub interval: Duration,
    /// Maximum jitter added to the interval (default: 1 second)
    pub jitter: Duration,
    /// Channel buffer size for collected batches
    pub buffer_size: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            jitter: Duration::from_secs(1),
            buffer_size: 16,
        }
    }
}

pub struct CollectionLoop {
    collector: Arc<VsphereCollector>,
    requests: Vec<MetricRequest>,
    config: CollectionConfig,
    batch_tx: mpsc::Sender<CollectionBatch>,
    health: HealthRegistry,
    logger: StructuredLogger,
}

impl CollectionLoop {
    pub fn new(
        collector: Arc<VsphereCollector>,
        requests: Vec<MetricRequest>,
        health: HealthRegistry,
        config: CollectionConfig,
    ) -> (Self, mpsc::Receiver<CollectionBatch>) {
        let (batch_tx, batch_rx) = mpsc::channel(config.buffer_size.max(1));
        let logger = StructuredLogger::new(collector.cluster_name());

        let loop_instance = Self {
            collector,
            requests,
            config,
            batch_tx,
            health,
            logger,
        };

        (loop_instance, batch_rx)
    }

    /// Run until `shutdown` fires
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            namespaces = self.requests.len(),
            "Starting vSphere collection loop"
        );

        let mut ticker = interval(self.current_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Outcome is already logged and recorded
                    let _ = self.run_cycle().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down vSphere collection loop");
                    break;
                }
            }
        }
    }

    fn current_interval(&self) -> Duration {
        // Jitter spreads agents polling the same vCenter
        let jitter_ms = rand_jitter(self.config.jitter.as_millis() as u64);
        self.config.interval + Duration::from_millis(jitter_ms)
    }

    /// Run one cycle, publish its batch and record the outcome
    pub(crate) async fn run_cycle(&self) -> Result<usize> {
        let start = Instant::now();
        let outcome = self.collector.collect(&self.requests).await;
        self.health.record_cycle(&outcome).await;

        match outcome {
            Ok(metrics) => {
                let count = metrics.len();
                self.logger
                    .log_cycle(self.requests.len(), count, start.elapsed().as_millis());

                let batch = CollectionBatch {
                    collected_at: Utc::now(),
                    metrics,
                };
                if let Err(e) = self.batch_tx.send(batch).await {
                    warn!(error = %e, "Failed to send collection batch to channel");
                }
                Ok(count)
            }
            Err(e) => {
                let failures = self.health.consecutive_failures().await;
                self.logger.log_failure(e.kind(), &e.to_string(), failures);
                Err(e)
            }
        }
    }
}

/// Random jitter between 0 and `max_ms`
fn rand_jitter(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;

    now % max_ms
}

/// Builder for the collection loop
pub struct CollectionLoopBuilder {
    collector: Option<Arc<VsphereCollector>>,
    requests: Vec<MetricRequest>,
    health: Option<HealthRegistry>,
    config: CollectionConfig,
}

impl CollectionLoopBuilder {
    pub fn new() -> Self {
        Self {
            collector: None,
            requests: Vec::new(),
            health: None,
            config: CollectionConfig::default(),
        }
    }

    pub fn collector(mut self, collector: Arc<VsphereCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Namespaces collected on every tick
    pub fn requests(mut self, requests: Vec<MetricRequest>) -> Self {
        self.requests = requests;
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.config.jitter = jitter;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn build(self) -> anyhow::Result<(CollectionLoop, mpsc::Receiver<CollectionBatch>)> {
        let collector = self
            .collector
            .ok_or_else(|| anyhow::anyhow!("Collector is required"))?;
        if self.requests.is_empty() {
            anyhow::bail!("At least one namespace is required");
        }
        if self.config.interval.is_zero() {
            anyhow::bail!("Collection interval must be greater than zero");
        }

        Ok(CollectionLoop::new(
            collector,
            self.requests,
            self.health.unwrap_or_default(),
            self.config,
        ))
    }
}

impl Default for CollectionLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{components, ComponentStatus};
    use crate::testing::FixtureApi;

    fn collector(api: FixtureApi) -> Arc<VsphereCollector> {
        Arc::new(VsphereCollector::new(Arc::new(api), "cluster"))
    }

    fn requests() -> Vec<MetricRequest> {
        vec!["/intel/vmware/vsphere/host/*/mem/*/usage".parse().unwrap()]
    }

    #[test]
    fn test_collection_config_default() {
        let config = CollectionConfig::default();
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.jitter, Duration::from_secs(1));
    }

    #[test]
    fn test_rand_jitter() {
        assert!(rand_jitter(1000) < 1000);
        assert_eq!(rand_jitter(0), 0);
    }

    #[test]
    fn test_builder_requires_collector_and_requests() {
        assert!(CollectionLoopBuilder::new().requests(requests()).build().is_err());
        assert!(CollectionLoopBuilder::new()
            .collector(collector(FixtureApi::new()))
            .build()
            .is_err());
        assert!(CollectionLoopBuilder::new()
            .collector(collector(FixtureApi::new()))
            .requests(requests())
            .interval(Duration::ZERO)
            .build()
            .is_err());
    }

    #[tokio::test]
    async fn test_cycle_publishes_batch() {
        let health = HealthRegistry::new();
        let (collection_loop, mut rx) = CollectionLoopBuilder::new()
            .collector(collector(FixtureApi::new()))
            .requests(requests())
            .health(health.clone())
            .build()
            .unwrap();

        assert_eq!(collection_loop.run_cycle().await.unwrap(), 2);

        let batch = rx.try_recv().unwrap();
        assert_eq!(batch.metrics.len(), 2);
        assert_eq!(health.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_failed_cycle_publishes_nothing() {
        let health = HealthRegistry::new();
        let (collection_loop, mut rx) = CollectionLoopBuilder::new()
            .collector(collector(FixtureApi::new().fail_query()))
            .requests(requests())
            .health(health.clone())
            .build()
            .unwrap();

        assert!(collection_loop.run_cycle().await.is_err());
        assert!(rx.try_recv().is_err());

        let status = health.health().await;
        assert_eq!(
            status.components[components::VSPHERE_API].status,
            ComponentStatus::Unhealthy
        );
        assert_eq!(health.consecutive_failures().await, 1);
    }

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let (collection_loop, mut rx) = CollectionLoopBuilder::new()
            .collector(collector(FixtureApi::new()))
            .requests(requests())
            .interval(Duration::from_millis(10))
            .jitter(Duration::ZERO)
            .build()
            .unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(collection_loop.run(shutdown_rx));

        // First tick fires immediately
        let batch = rx.recv().await.unwrap();
        assert!(!batch.metrics.is_empty());

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
