//! Projection of parsed samples onto the requested namespaces
//!
//! Each request picks out the samples it covers, gets its wildcard
//! positions filled in from those samples, and has the metric's transform
//! applied to the raw value. Requests matching nothing produce nothing.

use crate::definitions::{self, MetricDefinition};
use crate::error::{CollectorError, Result};
use crate::inventory::EntityResolver;
use crate::models::{DerivedMetric, ParsedSample, AGGREGATED_INSTANCE};
use crate::namespace::{selector_matches, MetricRequest};
use chrono::{DateTime, Utc};
use tracing::debug;

pub struct MetricProjector {
    timestamp: DateTime<Utc>,
}

impl MetricProjector {
    /// Every produced metric carries `timestamp`
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp }
    }

    pub async fn project(
        &self,
        requests: &[MetricRequest],
        samples: &[ParsedSample],
        resolver: &mut EntityResolver<'_>,
    ) -> Result<Vec<DerivedMetric>> {
        let mut metrics = Vec::new();

        for request in requests {
            let Some(definition) = definitions::for_request(request) else {
                continue;
            };

            let before = metrics.len();
            if definition.is_static() {
                self.project_static(request, definition, resolver, &mut metrics)
                    .await?;
            } else {
                for sample in samples.iter().filter(|s| covers(request, definition, s)) {
                    let host_memory = if definition.transform.needs_host_memory() {
                        host_memory(resolver, &sample.host_name).await?
                    } else {
                        0
                    };
                    metrics.push(DerivedMetric {
                        namespace: request.resolve(
                            &sample.host_name,
                            &sample.vm_name,
                            &sample.instance,
                        ),
                        value: definition.transform.apply(sample.value, host_memory),
                        unit: definition.unit.to_string(),
                        timestamp: self.timestamp,
                    });
                }
            }
            debug!(
                namespace = %request,
                produced = metrics.len() - before,
                "Projected request"
            );
        }

        Ok(metrics)
    }

    /// Metrics read from host attributes, one per matching host
    async fn project_static(
        &self,
        request: &MetricRequest,
        definition: &MetricDefinition,
        resolver: &mut EntityResolver<'_>,
        metrics: &mut Vec<DerivedMetric>,
    ) -> Result<()> {
        for host in resolver.find_hosts(&request.host).await? {
            metrics.push(DerivedMetric {
                namespace: request.resolve(&host.name, "", AGGREGATED_INSTANCE),
                value: definition.transform.apply(0, host.memory_size),
                unit: definition.unit.to_string(),
                timestamp: self.timestamp,
            });
        }
        Ok(())
    }
}

fn covers(request: &MetricRequest, definition: &MetricDefinition, sample: &ParsedSample) -> bool {
    let vm_matches = match &request.vm {
        None => sample.vm_name.is_empty(),
        Some(selector) => !sample.vm_name.is_empty() && selector_matches(selector, &sample.vm_name),
    };

    vm_matches
        && selector_matches(&request.host, &sample.host_name)
        && selector_matches(&request.instance, &sample.instance)
        && definition.depends_on(&sample.counter)
}

async fn host_memory(resolver: &mut EntityResolver<'_>, host_name: &str) -> Result<i64> {
    resolver
        .host_by_name(host_name)
        .await?
        .map(|host| host.memory_size)
        .ok_or_else(|| CollectorError::not_found("host", host_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricValue;
    use crate::testing::{FixtureApi, HOST1_MEMORY};

    fn sample(host: &str, vm: &str, counter: &str, instance: &str, value: i64) -> ParsedSample {
        ParsedSample {
            host_name: host.to_string(),
            vm_name: vm.to_string(),
            counter: counter.to_string(),
            instance: instance.to_string(),
            value,
        }
    }

    fn requests(namespaces: &[&str]) -> Vec<MetricRequest> {
        namespaces.iter().map(|ns| ns.parse().unwrap()).collect()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[tokio::test]
    async fn test_mem_free_uses_host_memory() {
        let api = FixtureApi::new();
        let mut resolver = EntityResolver::new(&api, "cluster");
        let samples = vec![sample("1.1.1.1", "", "mem.consumed.average", "0", 122_880)];

        let metrics = MetricProjector::new(now())
            .project(
                &requests(&["/intel/vmware/vsphere/host/1.1.1.1/mem/*/free"]),
                &samples,
                &mut resolver,
            )
            .await
            .unwrap();

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].namespace, "/intel/vmware/vsphere/host/1.1.1.1/mem/0/free");
        assert_eq!(
            metrics[0].value,
            MetricValue::Int(HOST1_MEMORY / (1024 * 1024) - 122_880 / 1024)
        );
        assert_eq!(metrics[0].value, MetricValue::Int(1057));
        assert_eq!(metrics[0].unit, "megabytes");
    }

    #[tokio::test]
    async fn test_wildcards_expand_over_samples() {
        let api = FixtureApi::new();
        let mut resolver = EntityResolver::new(&api, "cluster");
        let samples = vec![
            sample("1.1.1.1", "", "cpu.usage.average", "0", 100),
            sample("1.1.1.1", "", "cpu.usage.average", "1", 110),
            sample("2.2.2.2", "", "cpu.usage.average", "0", 120),
            sample("1.1.1.1", "VM1", "cpu.usage.average", "0", 500),
        ];

        let metrics = MetricProjector::new(now())
            .project(
                &requests(&["/intel/vmware/vsphere/host/*/cpu/*/idle"]),
                &samples,
                &mut resolver,
            )
            .await
            .unwrap();

        let namespaces: Vec<&str> = metrics.iter().map(|m| m.namespace.as_str()).collect();
        assert_eq!(
            namespaces,
            vec![
                "/intel/vmware/vsphere/host/1.1.1.1/cpu/0/idle",
                "/intel/vmware/vsphere/host/1.1.1.1/cpu/1/idle",
                "/intel/vmware/vsphere/host/2.2.2.2/cpu/0/idle",
            ]
        );
        assert_eq!(metrics[0].value, MetricValue::Float(99.0));
        assert_eq!(metrics[2].value, MetricValue::Float(98.8));
    }

    #[tokio::test]
    async fn test_vm_request_ignores_host_samples() {
        let api = FixtureApi::new();
        let mut resolver = EntityResolver::new(&api, "cluster");
        let samples = vec![
            sample("1.1.1.1", "", "net.bytesTx.average", "vmnic0", 400),
            sample("1.1.1.1", "VM1", "net.bytesTx.average", "vmnic0", 401),
            sample("1.1.1.1", "VM2", "net.bytesTx.average", "vmnic0", 402),
        ];

        let metrics = MetricProjector::new(now())
            .project(
                &requests(&["/intel/vmware/vsphere/host/*/vm/VM2/net/*/bytesTx"]),
                &samples,
                &mut resolver,
            )
            .await
            .unwrap();

        assert_eq!(metrics.len(), 1);
        assert_eq!(
            metrics[0].namespace,
            "/intel/vmware/vsphere/host/1.1.1.1/vm/VM2/net/vmnic0/bytesTx"
        );
        assert_eq!(metrics[0].value, MetricValue::Int(402));
    }

    #[tokio::test]
    async fn test_literal_instance_and_counter_membership() {
        let api = FixtureApi::new();
        let mut resolver = EntityResolver::new(&api, "cluster");
        let samples = vec![
            sample("2.2.2.2", "", "cpu.latency.average", AGGREGATED_INSTANCE, 200),
            sample("2.2.2.2", "", "cpu.usage.average", AGGREGATED_INSTANCE, 9000),
            sample("2.2.2.2", "", "cpu.latency.average", "3", 400),
        ];

        let metrics = MetricProjector::new(now())
            .project(
                &requests(&["/intel/vmware/vsphere/host/2.2.2.2/cpu/aggregated/wait"]),
                &samples,
                &mut resolver,
            )
            .await
            .unwrap();

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value, MetricValue::Float(2.0));
        assert_eq!(metrics[0].unit, "percent");
    }

    #[tokio::test]
    async fn test_mem_available_per_matching_host() {
        let api = FixtureApi::new();
        let mut resolver = EntityResolver::new(&api, "cluster");

        let metrics = MetricProjector::new(now())
            .project(
                &requests(&[
                    "/intel/vmware/vsphere/host/*/mem/*/available",
                    "/intel/vmware/vsphere/host/3.3.3.3/mem/*/available",
                ]),
                &[],
                &mut resolver,
            )
            .await
            .unwrap();

        assert_eq!(metrics.len(), 2);
        assert_eq!(
            metrics[0].namespace,
            "/intel/vmware/vsphere/host/1.1.1.1/mem/aggregated/available"
        );
        assert_eq!(metrics[0].value, MetricValue::Int(1177));
        assert_eq!(metrics[1].value, MetricValue::Int(4356));
    }

    #[tokio::test]
    async fn test_unmatched_requests_produce_nothing() {
        let api = FixtureApi::new();
        let mut resolver = EntityResolver::new(&api, "cluster");
        let samples = vec![sample("1.1.1.1", "", "mem.consumed.average", "0", 122_880)];

        let metrics = MetricProjector::new(now())
            .project(
                &requests(&[
                    "/intel/vmware/vsphere/host/*/cpu/*/bogus",
                    "/intel/vmware/vsphere/host/3.3.3.3/mem/*/free",
                    "/intel/vmware/vsphere/host/1.1.1.1/mem/7/usage",
                ]),
                &samples,
                &mut resolver,
            )
            .await
            .unwrap();

        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn test_shared_counter_feeds_several_metrics() {
        let api = FixtureApi::new();
        let mut resolver = EntityResolver::new(&api, "cluster");
        let samples = vec![sample("1.1.1.1", "", "mem.consumed.average", "0", 122_880)];

        let metrics = MetricProjector::new(now())
            .project(
                &requests(&[
                    "/intel/vmware/vsphere/host/1.1.1.1/mem/*/usage",
                    "/intel/vmware/vsphere/host/1.1.1.1/mem/*/free",
                ]),
                &samples,
                &mut resolver,
            )
            .await
            .unwrap();

        assert_eq!(
            metrics.iter().map(|m| m.value).collect::<Vec<_>>(),
            vec![MetricValue::Int(120), MetricValue::Int(1057)]
        );
    }
}
