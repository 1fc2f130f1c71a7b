//! Collection entry point
//!
//! A collection cycle is a sequential pipeline: refresh the counter
//! catalog, build one query spec per entity, run a single batched query,
//! parse the response and project it onto the requested namespaces. Each
//! cycle owns its catalog and inventory cache, so cycles running
//! concurrently on the same [`VsphereCollector`] share no mutable state.

mod r#loop;


pub use r#loop::{CollectionConfig, CollectionLoop, CollectionLoopBuilder};

use crate::api::{HttpPerfApi, PerfApi, QueryPerfResponse};
use crate::catalog::CounterCatalog;
use crate::config::ConnectionConfig;
use crate::definitions::{self, MetricType};
use crate::error::{CollectorError, Result};
use crate::inventory::EntityResolver;
use crate::models::DerivedMetric;
use crate::namespace::MetricRequest;
use crate::observability::CollectorMetrics;
use crate::parser::ResponseParser;
use crate::projector::MetricProjector;
use crate::query::QueryBuilder;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Collects vSphere metrics for one cluster
pub struct VsphereCollector {
    api: Arc<dyn PerfApi>,
    cluster_name: String,
    metrics: CollectorMetrics,
}

impl VsphereCollector {
    pub fn new(api: Arc<dyn PerfApi>, cluster_name: impl Into<String>) -> Self {
        Self {
            api,
            cluster_name: cluster_name.into(),
            metrics: CollectorMetrics::new(),
        }
    }

    /// Validate `config` and build a collector talking HTTP to its endpoint
    ///
    /// Fails with [`CollectorError::Config`] before any network call.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let api = HttpPerfApi::new(config)?;
        Ok(Self::new(Arc::new(api), config.cluster_name.clone()))
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Run one collection cycle for `requests`
    ///
    /// All or nothing: any failure aborts the cycle and no metrics are returned.
    pub async fn collect(&self, requests: &[MetricRequest]) -> Result<Vec<DerivedMetric>> {
        if requests.is_empty() {
            return Err(CollectorError::NoMetricsRequested);
        }

        let start = Instant::now();
        self.metrics.inc_cycles();

        let cycle = CollectionCycle::new(self.api.as_ref(), &self.cluster_name, &self.metrics);
        let result = cycle.run(requests).await;

        self.metrics
            .observe_cycle_latency(start.elapsed().as_secs_f64());
        match &result {
            Ok(metrics) => {
                self.metrics.set_emitted_metrics(metrics.len());
                debug!(
                    cluster = %self.cluster_name,
                    requests = requests.len(),
                    metrics = metrics.len(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Collection cycle complete"
                );
            }
            Err(e) => {
                self.metrics.inc_failed_cycles(e.kind());
                warn!(
                    cluster = %self.cluster_name,
                    kind = e.kind(),
                    error = %e,
                    "Collection cycle failed"
                );
            }
        }
        result
    }

    /// Parse namespace strings and collect them
    pub async fn collect_namespaces<S: AsRef<str>>(
        &self,
        namespaces: &[S],
    ) -> Result<Vec<DerivedMetric>> {
        let requests = parse_namespaces(namespaces)?;
        self.collect(&requests).await
    }

    /// Namespace templates this collector can produce
    pub fn metric_types(&self) -> Vec<MetricType> {
        definitions::metric_types()
    }
}

/// Parse every namespace, failing on the first malformed one
pub fn parse_namespaces<S: AsRef<str>>(namespaces: &[S]) -> Result<Vec<MetricRequest>> {
    namespaces.iter().map(|ns| ns.as_ref().parse()).collect()
}

/// State owned by a single cycle and dropped with it
struct CollectionCycle<'a> {
    api: &'a dyn PerfApi,
    cluster: &'a str,
    metrics: &'a CollectorMetrics,
    started_at: DateTime<Utc>,
}

impl<'a> CollectionCycle<'a> {
    fn new(api: &'a dyn PerfApi, cluster: &'a str, metrics: &'a CollectorMetrics) -> Self {
        Self {
            api,
            cluster,
            metrics,
            started_at: Utc::now(),
        }
    }

    async fn run(self, requests: &[MetricRequest]) -> Result<Vec<DerivedMetric>> {
        let catalog = CounterCatalog::refresh(self.api).await?;
        self.metrics.set_catalog_counters(catalog.len());

        let mut resolver = EntityResolver::new(self.api, self.cluster);

        let specs = QueryBuilder::new(&catalog)
            .build(requests, &mut resolver)
            .await?;
        self.metrics.set_query_specs(specs.len());

        let response = if specs.is_empty() {
            debug!(cluster = %self.cluster, "No entity matched, skipping performance query");
            QueryPerfResponse::default()
        } else {
            self.api.query_perf(&specs).await?
        };

        let samples = ResponseParser::new(&catalog)
            .parse(&response, &mut resolver)
            .await?;
        self.metrics.set_parsed_samples(samples.len());

        MetricProjector::new(self.started_at)
            .project(requests, &samples, &mut resolver)
            .await
    }
}
