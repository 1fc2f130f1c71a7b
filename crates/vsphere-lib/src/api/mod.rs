//! Boundary to the vSphere performance and inventory services
//!
//! The core engine only talks to vSphere through [`PerfApi`]. Session
//! handling and transport live behind it.

mod http;
mod types;

pub use http::HttpPerfApi;
pub use types::{
    EntityMetric, EntitySeries, IntSeries, MetricId, MetricSeries, QueryPerfResponse, QuerySpec,
    ALL_INSTANCES, REALTIME_INTERVAL_ID,
};

use crate::error::Result;
use crate::models::{CounterDescriptor, HostSystem, ManagedObjectRef, VirtualMachine};
use async_trait::async_trait;

/// Calls the collector needs from a vSphere endpoint
#[async_trait]
pub trait PerfApi: Send + Sync {
    /// List every performance counter currently available
    async fn retrieve_counters(&self) -> Result<Vec<CounterDescriptor>>;

    /// List hosts of the named cluster
    async fn retrieve_hosts(&self, cluster: &str) -> Result<Vec<HostSystem>>;

    /// List virtual machines registered on a host
    async fn retrieve_vms(&self, host: &ManagedObjectRef) -> Result<Vec<VirtualMachine>>;

    /// Run one batched performance query
    async fn query_perf(&self, specs: &[QuerySpec]) -> Result<QueryPerfResponse>;
}
