//! Wire types for the performance query call
//!
//! A response holds one block per queried entity; each block holds one
//! series per counter instance; each series holds the sampled values. With
//! the real-time interval and `maxSample = 1` every series carries exactly
//! one value.

use crate::models::ManagedObjectRef;
use serde::{Deserialize, Serialize};

/// Real-time sampling interval (20 seconds), skips historical rollups
pub const REALTIME_INTERVAL_ID: i32 = 20;

/// Instance selector requesting every instance of a counter
pub const ALL_INSTANCES: &str = "*";

const RESPONSE_FORMAT: &str = "normal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricId {
    pub counter_id: i32,
    pub instance: String,
}

/// Batched counter request for a single entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    pub entity: ManagedObjectRef,
    pub interval_id: i32,
    pub max_sample: i32,
    pub format: String,
    pub metric_id: Vec<MetricId>,
}

impl QuerySpec {
    /// Empty latest-sample query for `entity`
    pub fn realtime(entity: ManagedObjectRef) -> Self {
        Self {
            entity,
            interval_id: REALTIME_INTERVAL_ID,
            max_sample: 1,
            format: RESPONSE_FORMAT.to_string(),
            metric_id: Vec::new(),
        }
    }

    /// Request all instances of `counter_id`; returns false if already requested
    pub fn add_counter(&mut self, counter_id: i32) -> bool {
        if self.metric_id.iter().any(|m| m.counter_id == counter_id) {
            return false;
        }
        self.metric_id.push(MetricId {
            counter_id,
            instance: ALL_INSTANCES.to_string(),
        });
        true
    }

    pub fn counter_ids(&self) -> Vec<i32> {
        self.metric_id.iter().map(|m| m.counter_id).collect()
    }
}

/// Integer series for one counter instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntSeries {
    pub id: MetricId,
    pub value: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MetricSeries {
    #[serde(rename = "PerfMetricIntSeries")]
    Int(IntSeries),
}

/// Series returned for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySeries {
    pub entity: ManagedObjectRef,
    #[serde(default)]
    pub value: Vec<MetricSeries>,
}

/// Per-entity result block, tagged by managed object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entityType")]
pub enum EntityMetric {
    HostSystem(EntitySeries),
    VirtualMachine(EntitySeries),
}

impl EntityMetric {
    pub fn series(&self) -> &EntitySeries {
        match self {
            EntityMetric::HostSystem(series) | EntityMetric::VirtualMachine(series) => series,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPerfResponse {
    #[serde(default)]
    pub returnval: Vec<EntityMetric>,
}
