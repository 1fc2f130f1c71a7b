//! Performance response flattening
//!
//! Walks the per-entity / per-instance response and emits one
//! [`ParsedSample`] per series, attributed to host and VM display names.
//! Every sample must be attributable: an unknown reference or counter id
//! aborts the parse.

use crate::api::{EntityMetric, MetricSeries, QueryPerfResponse};
use crate::catalog::CounterCatalog;
use crate::error::{CollectorError, Result};
use crate::inventory::EntityResolver;
use crate::models::{normalize_instance, EntityKind, ParsedSample};
use tracing::debug;

pub struct ResponseParser<'a> {
    catalog: &'a CounterCatalog,
}

impl<'a> ResponseParser<'a> {
    pub fn new(catalog: &'a CounterCatalog) -> Self {
        Self { catalog }
    }

    pub async fn parse(
        &self,
        response: &QueryPerfResponse,
        resolver: &mut EntityResolver<'_>,
    ) -> Result<Vec<ParsedSample>> {
        let mut samples = Vec::new();

        for block in &response.returnval {
            let (host_name, vm_name) = match block {
                EntityMetric::HostSystem(series) => {
                    expect_kind(&series.entity.kind, EntityKind::HostSystem)?;
                    let host = resolver.resolve_host_by_ref(&series.entity).await?;
                    (host.name, String::new())
                }
                EntityMetric::VirtualMachine(series) => {
                    expect_kind(&series.entity.kind, EntityKind::VirtualMachine)?;
                    let vm = resolver.resolve_vm_by_ref(&series.entity).await?;
                    let host_ref = vm.runtime_host.as_ref().ok_or_else(|| {
                        CollectorError::not_found("runtime host of virtual machine", vm.name.clone())
                    })?;
                    let host = resolver.resolve_host_by_ref(host_ref).await?;
                    (host.name, vm.name)
                }
            };

            for series in &block.series().value {
                let MetricSeries::Int(int_series) = series;

                if int_series.value.len() != 1 {
                    return Err(CollectorError::malformed(format!(
                        "expected exactly one value for counter {} instance {:?} on {}, got {}",
                        int_series.id.counter_id,
                        int_series.id.instance,
                        block.series().entity.value,
                        int_series.value.len()
                    )));
                }

                let counter = self.catalog.resolve_by_id(int_series.id.counter_id)?;
                samples.push(ParsedSample {
                    host_name: host_name.clone(),
                    vm_name: vm_name.clone(),
                    counter: counter.full_name(),
                    instance: normalize_instance(&int_series.id.instance),
                    value: int_series.value[0],
                });
            }
        }

        debug!(
            entities = response.returnval.len(),
            samples = samples.len(),
            "Parsed performance response"
        );
        Ok(samples)
    }
}

fn expect_kind(actual: &EntityKind, expected: EntityKind) -> Result<()> {
    if *actual != expected {
        return Err(CollectorError::malformed(format!(
            "{:?} block carries a {:?} reference",
            expected, actual
        )));
    }
    Ok(())
}
