//! Batched query construction
//!
//! Turns the requested namespaces into one [`QuerySpec`] per distinct
//! entity, merging every counter that entity needs across all requests.

use crate::api::QuerySpec;
use crate::catalog::CounterCatalog;
use crate::definitions;
use crate::error::{CollectorError, Result};
use crate::inventory::EntityResolver;
use crate::namespace::MetricRequest;
use std::collections::BTreeMap;
use tracing::debug;

pub struct QueryBuilder<'a> {
    catalog: &'a CounterCatalog,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(catalog: &'a CounterCatalog) -> Self {
        Self { catalog }
    }

    /// Build the deduplicated spec list for `requests`
    ///
    /// Requests without a metric definition are skipped. Fails with
    /// [`CollectorError::EmptyQuery`] when none of the requests has one.
    /// Requests that match a definition but no entity contribute nothing,
    /// so the returned list may be empty.
    pub async fn build(
        &self,
        requests: &[MetricRequest],
        resolver: &mut EntityResolver<'_>,
    ) -> Result<Vec<QuerySpec>> {
        // Keyed by display name so requests naming the same entity converge.
        // VMs also carry their reference, since names are not unique per host.
        let mut host_specs: BTreeMap<String, QuerySpec> = BTreeMap::new();
        let mut vm_specs: BTreeMap<(String, String, String), QuerySpec> = BTreeMap::new();
        let mut matched = false;

        for request in requests {
            let Some(definition) = definitions::for_request(request) else {
                debug!(namespace = %request, "No metric definition, skipping");
                continue;
            };
            matched = true;

            if definition.is_static() {
                continue;
            }

            let counter_ids = definition
                .counters
                .iter()
                .map(|name| self.catalog.resolve_by_name(name).map(|c| c.id))
                .collect::<Result<Vec<i32>>>()?;

            for host in resolver.find_hosts(&request.host).await? {
                match &request.vm {
                    None => {
                        let spec = host_specs
                            .entry(host.name.clone())
                            .or_insert_with(|| QuerySpec::realtime(host.reference.clone()));
                        for id in &counter_ids {
                            spec.add_counter(*id);
                        }
                    }
                    Some(selector) => {
                        for vm in resolver.find_vms(&host.reference, selector).await? {
                            let spec = vm_specs
                                .entry((
                                    host.name.clone(),
                                    vm.name.clone(),
                                    vm.reference.value.clone(),
                                ))
                                .or_insert_with(|| QuerySpec::realtime(vm.reference.clone()));
                            for id in &counter_ids {
                                spec.add_counter(*id);
                            }
                        }
                    }
                }
            }
        }

        if !matched {
            return Err(CollectorError::EmptyQuery);
        }

        let specs: Vec<QuerySpec> = host_specs
            .into_values()
            .chain(vm_specs.into_values())
            .collect();
        debug!(
            specs = specs.len(),
            counters = specs.iter().map(|s| s.metric_id.len()).sum::<usize>(),
            "Built performance query"
        );
        Ok(specs)
    }
}
