//! Static metric definitions
//!
//! Maps each logical `group.metric` the collector exposes to the vSphere
//! counters it is computed from and the arithmetic turning raw counter
//! values into the published unit. The divisors are vSphere fixed-point
//! conventions and must be reproduced exactly.

use crate::models::MetricValue;
use crate::namespace::{MetricRequest, SourceKind, WILDCARD};
use serde::{Deserialize, Serialize};

const BYTES_PER_MEGABYTE: i64 = 1024 * 1024;
const KILOBYTES_PER_MEGABYTE: i64 = 1024;

/// How a raw counter value becomes a published value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    PassThrough,
    /// raw / divisor as a floating value
    Scale(f64),
    /// 100 - raw / 100, for percentages stored scaled by 100
    InvertPercent,
    /// raw kilobytes to megabytes
    KilobytesToMegabytes,
    /// host memory minus consumed memory, in megabytes
    HostMemoryFree,
    /// host memory in megabytes, no counter involved
    HostMemoryTotal,
}

impl Transform {
    /// Apply the transform; `host_memory_bytes` is only read by memory transforms
    pub fn apply(&self, raw: i64, host_memory_bytes: i64) -> MetricValue {
        match *self {
            Transform::PassThrough => MetricValue::Int(raw),
            Transform::Scale(divisor) => MetricValue::Float(raw as f64 / divisor),
            Transform::InvertPercent => MetricValue::Float(100.0 - raw as f64 / 100.0),
            Transform::KilobytesToMegabytes => MetricValue::Int(raw / KILOBYTES_PER_MEGABYTE),
            Transform::HostMemoryFree => MetricValue::Int(
                host_memory_bytes / BYTES_PER_MEGABYTE - raw / KILOBYTES_PER_MEGABYTE,
            ),
            Transform::HostMemoryTotal => MetricValue::Int(host_memory_bytes / BYTES_PER_MEGABYTE),
        }
    }

    pub fn needs_host_memory(&self) -> bool {
        matches!(self, Transform::HostMemoryFree | Transform::HostMemoryTotal)
    }
}

/// One logical metric and the counters it depends on
#[derive(Debug, Clone)]
pub struct MetricDefinition {
    pub kinds: &'static [SourceKind],
    pub group: &'static str,
    pub metric: &'static str,
    /// Counter full names (`group.name.rollup`); empty for static metrics
    pub counters: &'static [&'static str],
    pub transform: Transform,
    pub unit: &'static str,
    pub description: &'static str,
}

impl MetricDefinition {
    /// Whether the value comes from host attributes instead of a counter
    pub fn is_static(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn depends_on(&self, counter: &str) -> bool {
        self.counters.iter().any(|c| *c == counter)
    }
}

const HOST: &[SourceKind] = &[SourceKind::Host];
const VM: &[SourceKind] = &[SourceKind::Vm];
const HOST_AND_VM: &[SourceKind] = &[SourceKind::Host, SourceKind::Vm];

static DEFINITIONS: &[MetricDefinition] = &[
    MetricDefinition {
        kinds: HOST_AND_VM,
        group: "cpu",
        metric: "idle",
        counters: &["cpu.usage.average"],
        transform: Transform::InvertPercent,
        unit: "percent",
        description: "CPU idle time",
    },
    MetricDefinition {
        kinds: HOST_AND_VM,
        group: "cpu",
        metric: "wait",
        counters: &["cpu.latency.average"],
        transform: Transform::Scale(100.0),
        unit: "percent",
        description: "Time spent waiting for a physical CPU",
    },
    MetricDefinition {
        kinds: HOST,
        group: "cpu",
        metric: "load",
        counters: &["rescpu.actav5.latest"],
        transform: Transform::Scale(100_000.0),
        unit: "load",
        description: "CPU load averaged over five minutes",
    },
    MetricDefinition {
        kinds: HOST,
        group: "rescpu",
        metric: "load",
        counters: &["rescpu.actav1.latest"],
        transform: Transform::Scale(1_000.0),
        unit: "load",
        description: "CPU load averaged over one minute",
    },
    MetricDefinition {
        kinds: HOST_AND_VM,
        group: "mem",
        metric: "usage",
        counters: &["mem.consumed.average"],
        transform: Transform::KilobytesToMegabytes,
        unit: "megabytes",
        description: "Consumed memory",
    },
    MetricDefinition {
        kinds: HOST,
        group: "mem",
        metric: "free",
        counters: &["mem.consumed.average"],
        transform: Transform::HostMemoryFree,
        unit: "megabytes",
        description: "Host free memory",
    },
    MetricDefinition {
        kinds: HOST,
        group: "mem",
        metric: "available",
        counters: &[],
        transform: Transform::HostMemoryTotal,
        unit: "megabytes",
        description: "Host physical memory",
    },
    MetricDefinition {
        kinds: HOST_AND_VM,
        group: "net",
        metric: "bytesTx",
        counters: &["net.bytesTx.average"],
        transform: Transform::PassThrough,
        unit: "kilobytes per second",
        description: "Network transmit rate",
    },
    MetricDefinition {
        kinds: HOST_AND_VM,
        group: "net",
        metric: "bytesRx",
        counters: &["net.bytesRx.average"],
        transform: Transform::PassThrough,
        unit: "kilobytes per second",
        description: "Network receive rate",
    },
    MetricDefinition {
        kinds: HOST_AND_VM,
        group: "net",
        metric: "packetsTx",
        counters: &["net.packetsTx.summation"],
        transform: Transform::PassThrough,
        unit: "packets",
        description: "Packets transmitted during the sampling interval",
    },
    MetricDefinition {
        kinds: HOST_AND_VM,
        group: "net",
        metric: "packetsRx",
        counters: &["net.packetsRx.summation"],
        transform: Transform::PassThrough,
        unit: "packets",
        description: "Packets received during the sampling interval",
    },
    MetricDefinition {
        kinds: VM,
        group: "virtualDisk",
        metric: "readIops",
        counters: &["virtualDisk.numberReadAveraged.average"],
        transform: Transform::PassThrough,
        unit: "operations per second",
        description: "Virtual disk read operations",
    },
    MetricDefinition {
        kinds: VM,
        group: "virtualDisk",
        metric: "writeIops",
        counters: &["virtualDisk.numberWriteAveraged.average"],
        transform: Transform::PassThrough,
        unit: "operations per second",
        description: "Virtual disk write operations",
    },
    MetricDefinition {
        kinds: VM,
        group: "virtualDisk",
        metric: "readThroughput",
        counters: &["virtualDisk.read.average"],
        transform: Transform::PassThrough,
        unit: "kilobytes per second",
        description: "Virtual disk read rate",
    },
    MetricDefinition {
        kinds: VM,
        group: "virtualDisk",
        metric: "writeThroughput",
        counters: &["virtualDisk.write.average"],
        transform: Transform::PassThrough,
        unit: "kilobytes per second",
        description: "Virtual disk write rate",
    },
    MetricDefinition {
        kinds: VM,
        group: "virtualDisk",
        metric: "readLatency",
        counters: &["virtualDisk.totalReadLatency.average"],
        transform: Transform::PassThrough,
        unit: "milliseconds",
        description: "Virtual disk read latency",
    },
    MetricDefinition {
        kinds: VM,
        group: "virtualDisk",
        metric: "writeLatency",
        counters: &["virtualDisk.totalWriteLatency.average"],
        transform: Transform::PassThrough,
        unit: "milliseconds",
        description: "Virtual disk write latency",
    },
];

/// All known definitions
pub fn all() -> &'static [MetricDefinition] {
    DEFINITIONS
}

/// Definition for a `(kind, group, metric)` triple, if the collector supports it
pub fn lookup(kind: SourceKind, group: &str, metric: &str) -> Option<&'static MetricDefinition> {
    DEFINITIONS
        .iter()
        .find(|d| d.group == group && d.metric == metric && d.kinds.contains(&kind))
}

/// Definition matching a request's source kind and `group.metric`
pub fn for_request(request: &MetricRequest) -> Option<&'static MetricDefinition> {
    lookup(request.kind(), &request.group, &request.metric)
}

/// Namespace template describing a metric the collector can produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricType {
    pub namespace: String,
    pub unit: String,
    pub description: String,
}

/// Every namespace template, host form first then VM form
pub fn metric_types() -> Vec<MetricType> {
    let mut types = Vec::new();
    for kind in [SourceKind::Host, SourceKind::Vm] {
        for definition in DEFINITIONS.iter().filter(|d| d.kinds.contains(&kind)) {
            let template = MetricRequest {
                host: WILDCARD.to_string(),
                vm: (kind == SourceKind::Vm).then(|| WILDCARD.to_string()),
                group: definition.group.to_string(),
                instance: WILDCARD.to_string(),
                metric: definition.metric.to_string(),
            };
            types.push(MetricType {
                namespace: template.to_string(),
                unit: definition.unit.to_string(),
                description: definition.description.to_string(),
            });
        }
    }
    types
}
