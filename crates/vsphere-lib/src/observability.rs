//! Observability infrastructure for the collector
//!
//! Provides:
//! - Prometheus metrics (cycle latency, cycle outcomes, per-cycle volumes)
//! - Event-style structured logging with tracing

use prometheus::{
    proto::MetricFamily, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for cycle latency (in seconds); a cycle is several round trips
const CYCLE_LATENCY_BUCKETS: &[f64] = &[
    0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

static GLOBAL_METRICS: OnceLock<CollectorMetricsInner> = OnceLock::new();

struct CollectorMetricsInner {
    cycle_latency_seconds: Histogram,
    cycles_total: IntCounter,
    failed_cycles_total: IntCounterVec,
    query_specs: IntGauge,
    parsed_samples: IntGauge,
    emitted_metrics: IntGauge,
    catalog_counters: IntGauge,
}

impl CollectorMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "vsphere_collector_cycle_latency_seconds",
                "Time spent on one collection cycle, catalog refresh to projection",
                CYCLE_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            cycles_total: register_int_counter!(
                "vsphere_collector_cycles_total",
                "Total number of collection cycles attempted"
            )
            .expect("Failed to register cycles_total"),

            failed_cycles_total: register_int_counter_vec!(
                "vsphere_collector_failed_cycles_total",
                "Collection cycles aborted, by error kind",
                &["kind"]
            )
            .expect("Failed to register failed_cycles_total"),

            query_specs: register_int_gauge!(
                "vsphere_collector_query_specs",
                "Entity query specs sent in the last cycle"
            )
            .expect("Failed to register query_specs"),

            parsed_samples: register_int_gauge!(
                "vsphere_collector_parsed_samples",
                "Samples parsed from the last performance response"
            )
            .expect("Failed to register parsed_samples"),

            emitted_metrics: register_int_gauge!(
                "vsphere_collector_emitted_metrics",
                "Metrics produced by the last successful cycle"
            )
            .expect("Failed to register emitted_metrics"),

            catalog_counters: register_int_gauge!(
                "vsphere_collector_catalog_counters",
                "Performance counters advertised by vSphere at the last refresh"
            )
            .expect("Failed to register catalog_counters"),
        }
    }
}

/// Handle to the process-wide collector metrics
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct CollectorMetrics {
    _private: (),
}

impl Default for CollectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorMetrics {
    /// Create a handle, registering the metrics on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(CollectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &CollectorMetricsInner {
        GLOBAL_METRICS.get_or_init(CollectorMetricsInner::new)
    }

    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().cycle_latency_seconds.observe(duration_secs);
    }

    pub fn inc_cycles(&self) {
        self.inner().cycles_total.inc();
    }

    /// Count an aborted cycle under its [`CollectorError::kind`](crate::CollectorError::kind) label
    pub fn inc_failed_cycles(&self, kind: &str) {
        self.inner().failed_cycles_total.with_label_values(&[kind]).inc();
    }

    pub fn set_query_specs(&self, count: usize) {
        self.inner().query_specs.set(count as i64);
    }

    pub fn set_parsed_samples(&self, count: usize) {
        self.inner().parsed_samples.set(count as i64);
    }

    pub fn set_emitted_metrics(&self, count: usize) {
        self.inner().emitted_metrics.set(count as i64);
    }

    pub fn set_catalog_counters(&self, count: usize) {
        self.inner().catalog_counters.set(count as i64);
    }

    /// Gather the default registry, collector metrics included
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.inner();
        prometheus::gather()
    }

    pub fn cycles(&self) -> u64 {
        self.inner().cycles_total.get()
    }

    pub fn failed_cycles(&self, kind: &str) -> u64 {
        self.inner()
            .failed_cycles_total
            .with_label_values(&[kind])
            .get()
    }
}

/// Structured logger for collector lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    cluster: String,
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    pub fn log_startup(&self, version: &str, url: &str, namespaces: usize) {
        info!(
            event = "agent_started",
            cluster = %self.cluster,
            agent_version = %version,
            vsphere_url = %url,
            namespaces = namespaces,
            "vSphere collector started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            cluster = %self.cluster,
            reason = %reason,
            "vSphere collector shutting down"
        );
    }

    pub fn log_cycle(&self, requests: usize, metrics: usize, elapsed_ms: u128) {
        info!(
            event = "collection_cycle",
            cluster = %self.cluster,
            requests = requests,
            metrics = metrics,
            elapsed_ms = elapsed_ms,
            "Collection cycle complete"
        );
    }

    pub fn log_failure(&self, kind: &str, error: &str, consecutive_failures: u32) {
        warn!(
            event = "collection_failed",
            cluster = %self.cluster,
            kind = %kind,
            error = %error,
            consecutive_failures = consecutive_failures,
            "Collection cycle failed"
        );
    }
}
