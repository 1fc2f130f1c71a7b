//! Core data models for the vSphere collector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instance token substituted for the provider's empty (whole-entity) instance
pub const AGGREGATED_INSTANCE: &str = "aggregated";

/// Managed object type of a monitored entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    HostSystem,
    VirtualMachine,
}

/// Opaque provider handle for a managed object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedObjectRef {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub value: String,
}

impl ManagedObjectRef {
    pub fn host(value: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::HostSystem,
            value: value.into(),
        }
    }

    pub fn vm(value: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::VirtualMachine,
            value: value.into(),
        }
    }
}

impl fmt::Display for ManagedObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.value)
    }
}

/// ESXi host as listed by the cluster inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSystem {
    pub reference: ManagedObjectRef,
    pub name: String,
    /// Total physical memory in bytes
    pub memory_size: i64,
}

/// Virtual machine as listed by a host inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    pub reference: ManagedObjectRef,
    pub name: String,
    /// Host currently running the VM
    #[serde(default)]
    pub runtime_host: Option<ManagedObjectRef>,
}

/// Aggregation method a counter value represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollupType {
    Average,
    Latest,
    Summation,
    Maximum,
    Minimum,
    None,
}

impl fmt::Display for RollupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RollupType::Average => "average",
            RollupType::Latest => "latest",
            RollupType::Summation => "summation",
            RollupType::Maximum => "maximum",
            RollupType::Minimum => "minimum",
            RollupType::None => "none",
        };
        f.write_str(s)
    }
}

/// Performance counter advertised by the vSphere performance manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterDescriptor {
    pub id: i32,
    pub group: String,
    pub name: String,
    pub rollup_type: RollupType,
}

impl CounterDescriptor {
    /// `group.name.rollupType`, the only form counters are looked up by
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}", self.group, self.name, self.rollup_type)
    }
}

/// One value from the performance response, attributed to its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSample {
    pub host_name: String,
    /// Empty for host-level samples
    pub vm_name: String,
    pub counter: String,
    pub instance: String,
    pub value: i64,
}

/// Rewrite the provider's empty instance token to [`AGGREGATED_INSTANCE`]
pub fn normalize_instance(instance: &str) -> String {
    if instance.is_empty() {
        AGGREGATED_INSTANCE.to_string()
    } else {
        instance.to_string()
    }
}

/// Metric value after unit conversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Final metric record with a fully resolved namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetric {
    pub namespace: String,
    pub value: MetricValue,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
}

/// Metrics produced by one periodic collection cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionBatch {
    pub collected_at: DateTime<Utc>,
    pub metrics: Vec<DerivedMetric>,
}
