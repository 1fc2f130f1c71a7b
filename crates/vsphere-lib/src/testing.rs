//! In-memory vSphere used by the unit and pipeline tests
//!
//! Two hosts, two VMs on the first host, and a fixed set of counters with
//! per-instance sample data. Every queried entity reports the same data.

use crate::api::{
    EntityMetric, EntitySeries, IntSeries, MetricId, MetricSeries, PerfApi, QueryPerfResponse,
    QuerySpec, ALL_INSTANCES,
};
use crate::error::{CollectorError, Result};
use crate::models::{
    CounterDescriptor, EntityKind, HostSystem, ManagedObjectRef, RollupType, VirtualMachine,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const HOST1_MEMORY: i64 = 1_234_567_890;
pub const HOST2_MEMORY: i64 = 4_567_890_123;

/// (counter id, instance, value) rows served by the fake performance manager
const SAMPLES: &[(i32, &str, i64)] = &[
    // cpu
    (1, "0", 100),
    (1, "1", 110),
    (1, "2", 120),
    (2, "", 200),
    // rescpu
    (3, "", 300),
    (15, "", 150_000),
    // mem
    (4, "0", 122_880),
    // net
    (5, "vmnic0", 400),
    (6, "vmnic0", 500),
    (7, "vmnic0", 600),
    (8, "vmnic0", 700),
    // virtualDisk
    (9, "0", 800),
    (10, "0", 900),
    (11, "0", 1000),
    (12, "0", 1100),
    (13, "0", 1200),
    (14, "0", 1300),
];

pub fn fixture_counters() -> Vec<CounterDescriptor> {
    let rows: &[(i32, &str, &str, RollupType)] = &[
        (1, "cpu", "usage", RollupType::Average),
        (2, "cpu", "latency", RollupType::Average),
        (3, "rescpu", "actav1", RollupType::Latest),
        (4, "mem", "consumed", RollupType::Average),
        (5, "net", "bytesTx", RollupType::Average),
        (6, "net", "bytesRx", RollupType::Average),
        (7, "net", "packetsTx", RollupType::Summation),
        (8, "net", "packetsRx", RollupType::Summation),
        (9, "virtualDisk", "numberReadAveraged", RollupType::Average),
        (10, "virtualDisk", "numberWriteAveraged", RollupType::Average),
        (11, "virtualDisk", "read", RollupType::Average),
        (12, "virtualDisk", "write", RollupType::Average),
        (13, "virtualDisk", "totalReadLatency", RollupType::Average),
        (14, "virtualDisk", "totalWriteLatency", RollupType::Average),
        (15, "rescpu", "actav5", RollupType::Latest),
    ];
    rows.iter()
        .map(|(id, group, name, rollup)| CounterDescriptor {
            id: *id,
            group: group.to_string(),
            name: name.to_string(),
            rollup_type: *rollup,
        })
        .collect()
}

pub fn fixture_hosts() -> Vec<HostSystem> {
    vec![
        HostSystem {
            reference: ManagedObjectRef::host("host-1"),
            name: "1.1.1.1".to_string(),
            memory_size: HOST1_MEMORY,
        },
        HostSystem {
            reference: ManagedObjectRef::host("host-2"),
            name: "2.2.2.2".to_string(),
            memory_size: HOST2_MEMORY,
        },
    ]
}

fn fixture_vms(host: &ManagedObjectRef) -> Vec<VirtualMachine> {
    if host.value != "host-1" {
        return Vec::new();
    }
    ["VM1", "VM2"]
        .iter()
        .enumerate()
        .map(|(i, name)| VirtualMachine {
            reference: ManagedObjectRef::vm(format!("vm-{}", i + 1)),
            name: name.to_string(),
            runtime_host: Some(host.clone()),
        })
        .collect()
}

/// Answer `specs` from [`SAMPLES`], one block per spec
pub fn fixture_response(specs: &[QuerySpec]) -> QueryPerfResponse {
    let returnval = specs
        .iter()
        .map(|spec| {
            let value = spec
                .metric_id
                .iter()
                .flat_map(|metric_id| {
                    SAMPLES
                        .iter()
                        .filter(move |(id, instance, _)| {
                            *id == metric_id.counter_id
                                && (metric_id.instance == ALL_INSTANCES
                                    || metric_id.instance == *instance)
                        })
                        .map(|(id, instance, data)| {
                            MetricSeries::Int(IntSeries {
                                id: MetricId {
                                    counter_id: *id,
                                    instance: instance.to_string(),
                                },
                                value: vec![*data],
                            })
                        })
                })
                .collect();
            let series = EntitySeries {
                entity: spec.entity.clone(),
                value,
            };
            match spec.entity.kind {
                EntityKind::HostSystem => EntityMetric::HostSystem(series),
                EntityKind::VirtualMachine => EntityMetric::VirtualMachine(series),
            }
        })
        .collect();
    QueryPerfResponse { returnval }
}

#[derive(Default)]
pub struct FixtureApi {
    hosts: Option<Vec<HostSystem>>,
    vms: Option<Vec<VirtualMachine>>,
    response: Option<QueryPerfResponse>,
    counters_error: bool,
    hosts_error: bool,
    vms_error: bool,
    query_error: bool,
    host_fetches: AtomicUsize,
    vm_fetches: AtomicUsize,
    counter_fetches: AtomicUsize,
    queries: Mutex<Vec<Vec<QuerySpec>>>,
}

impl FixtureApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hosts(mut self, hosts: Vec<HostSystem>) -> Self {
        self.hosts = Some(hosts);
        self
    }

    /// Serve these VMs, each listed under its runtime host
    pub fn with_vms(mut self, vms: Vec<VirtualMachine>) -> Self {
        self.vms = Some(vms);
        self
    }

    /// Serve this response instead of computing one from the specs
    pub fn with_response(mut self, response: QueryPerfResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn fail_counters(mut self) -> Self {
        self.counters_error = true;
        self
    }

    pub fn fail_hosts(mut self) -> Self {
        self.hosts_error = true;
        self
    }

    pub fn fail_vms(mut self) -> Self {
        self.vms_error = true;
        self
    }

    pub fn fail_query(mut self) -> Self {
        self.query_error = true;
        self
    }

    pub fn host_fetches(&self) -> usize {
        self.host_fetches.load(Ordering::SeqCst)
    }

    pub fn vm_fetches(&self) -> usize {
        self.vm_fetches.load(Ordering::SeqCst)
    }

    pub fn counter_fetches(&self) -> usize {
        self.counter_fetches.load(Ordering::SeqCst)
    }

    /// Every batch of specs passed to `query_perf`
    pub fn queries(&self) -> Vec<Vec<QuerySpec>> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PerfApi for FixtureApi {
    async fn retrieve_counters(&self) -> Result<Vec<CounterDescriptor>> {
        self.counter_fetches.fetch_add(1, Ordering::SeqCst);
        if self.counters_error {
            return Err(CollectorError::transport("counter catalog refresh", "test error"));
        }
        Ok(fixture_counters())
    }

    async fn retrieve_hosts(&self, _cluster: &str) -> Result<Vec<HostSystem>> {
        self.host_fetches.fetch_add(1, Ordering::SeqCst);
        if self.hosts_error {
            return Err(CollectorError::transport("host inventory fetch", "test error"));
        }
        Ok(self.hosts.clone().unwrap_or_else(fixture_hosts))
    }

    async fn retrieve_vms(&self, host: &ManagedObjectRef) -> Result<Vec<VirtualMachine>> {
        self.vm_fetches.fetch_add(1, Ordering::SeqCst);
        if self.vms_error {
            return Err(CollectorError::transport(
                "virtual machine inventory fetch",
                "test error",
            ));
        }
        match &self.vms {
            Some(vms) => Ok(vms
                .iter()
                .filter(|vm| vm.runtime_host.as_ref() == Some(host))
                .cloned()
                .collect()),
            None => Ok(fixture_vms(host)),
        }
    }

    async fn query_perf(&self, specs: &[QuerySpec]) -> Result<QueryPerfResponse> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(specs.to_vec());
        }
        if self.query_error {
            return Err(CollectorError::transport("performance query", "test error"));
        }
        Ok(self
            .response
            .clone()
            .unwrap_or_else(|| fixture_response(specs)))
    }
}
