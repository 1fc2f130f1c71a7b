//! Entity resolution with a per-cycle inventory cache
//!
//! Resolves namespace selectors (a literal name or `*`) to hosts and VMs,
//! and resolves references returned by the performance query back to names.
//! Hosts are fetched at most once per cycle and each host's VM list at most
//! once per cycle, however many requests touch them.

use crate::api::PerfApi;
use crate::error::{CollectorError, Result};
use crate::models::{HostSystem, ManagedObjectRef, VirtualMachine};
use crate::namespace::selector_matches;
use std::collections::HashMap;
use tracing::debug;

/// Inventory cache scoped to one collection cycle
pub struct EntityResolver<'a> {
    api: &'a dyn PerfApi,
    cluster: String,
    hosts: Option<Vec<HostSystem>>,
    /// host reference value -> VMs on that host
    vms: HashMap<String, Vec<VirtualMachine>>,
    fetches: usize,
}

impl<'a> EntityResolver<'a> {
    pub fn new(api: &'a dyn PerfApi, cluster: impl Into<String>) -> Self {
        Self {
            api,
            cluster: cluster.into(),
            hosts: None,
            vms: HashMap::new(),
            fetches: 0,
        }
    }

    /// Drop everything cached so the next lookup hits vSphere again
    pub fn clear_cache(&mut self) {
        self.hosts = None;
        self.vms.clear();
    }

    /// Number of inventory calls made so far
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    async fn hosts(&mut self) -> Result<&[HostSystem]> {
        if self.hosts.is_none() {
            let hosts = self.api.retrieve_hosts(&self.cluster).await?;
            self.fetches += 1;
            debug!(cluster = %self.cluster, hosts = hosts.len(), "Fetched host inventory");
            self.hosts = Some(hosts);
        }
        Ok(self.hosts.as_deref().unwrap_or_default())
    }

    async fn vms(&mut self, host: &ManagedObjectRef) -> Result<&[VirtualMachine]> {
        if !self.vms.contains_key(&host.value) {
            let vms = self.api.retrieve_vms(host).await?;
            self.fetches += 1;
            debug!(host = %host.value, vms = vms.len(), "Fetched virtual machine inventory");
            self.vms.insert(host.value.clone(), vms);
        }
        Ok(self
            .vms
            .get(&host.value)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Hosts whose name equals `selector`, or every host for `*`, in inventory order
    pub async fn find_hosts(&mut self, selector: &str) -> Result<Vec<HostSystem>> {
        let hosts = self.hosts().await?;
        Ok(hosts
            .iter()
            .filter(|h| selector_matches(selector, &h.name))
            .cloned()
            .collect())
    }

    /// VMs on `host` whose name equals `selector`, or all of them for `*`
    pub async fn find_vms(
        &mut self,
        host: &ManagedObjectRef,
        selector: &str,
    ) -> Result<Vec<VirtualMachine>> {
        let vms = self.vms(host).await?;
        Ok(vms
            .iter()
            .filter(|vm| selector_matches(selector, &vm.name))
            .cloned()
            .collect())
    }

    pub async fn resolve_host_by_ref(&mut self, reference: &ManagedObjectRef) -> Result<HostSystem> {
        let hosts = self.hosts().await?;
        hosts
            .iter()
            .find(|h| &h.reference == reference)
            .cloned()
            .ok_or_else(|| CollectorError::not_found("host reference", reference.value.clone()))
    }

    pub async fn resolve_vm_by_ref(
        &mut self,
        reference: &ManagedObjectRef,
    ) -> Result<VirtualMachine> {
        let host_refs: Vec<ManagedObjectRef> =
            self.hosts().await?.iter().map(|h| h.reference.clone()).collect();

        for host_ref in &host_refs {
            if let Some(vm) = self
                .vms(host_ref)
                .await?
                .iter()
                .find(|vm| &vm.reference == reference)
            {
                return Ok(vm.clone());
            }
        }

        Err(CollectorError::not_found(
            "virtual machine reference",
            reference.value.clone(),
        ))
    }

    /// Host with exactly this display name, if present in the inventory
    pub async fn host_by_name(&mut self, name: &str) -> Result<Option<HostSystem>> {
        let hosts = self.hosts().await?;
        Ok(hosts.iter().find(|h| h.name == name).cloned())
    }
}
