//! Performance counter catalog
//!
//! Snapshot of the counters vSphere advertises, indexed by full name and by
//! id. Counter availability can change at runtime, so a catalog is built
//! fresh for every collection cycle and never updated in place.

use crate::api::PerfApi;
use crate::error::{CollectorError, Result};
use crate::models::CounterDescriptor;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct CounterCatalog {
    by_name: HashMap<String, CounterDescriptor>,
    by_id: HashMap<i32, CounterDescriptor>,
}

impl CounterCatalog {
    /// Fetch the full counter list from vSphere
    pub async fn refresh(api: &dyn PerfApi) -> Result<Self> {
        let counters = api.retrieve_counters().await?;
        let catalog = Self::from_counters(counters);
        info!(counters = catalog.len(), "Refreshed performance counter catalog");
        Ok(catalog)
    }

    /// Index `counters`; the first descriptor wins on a repeated name or id
    pub fn from_counters(counters: impl IntoIterator<Item = CounterDescriptor>) -> Self {
        let mut catalog = Self::default();
        for counter in counters {
            let full_name = counter.full_name();
            if catalog.by_name.contains_key(&full_name) || catalog.by_id.contains_key(&counter.id) {
                debug!(counter = %full_name, id = counter.id, "Duplicate counter, keeping first");
                continue;
            }
            catalog.by_name.insert(full_name, counter.clone());
            catalog.by_id.insert(counter.id, counter);
        }
        catalog
    }

    /// Look up a counter by exact `group.name.rollup`
    pub fn resolve_by_name(&self, full_name: &str) -> Result<&CounterDescriptor> {
        self.by_name
            .get(full_name)
            .ok_or_else(|| CollectorError::not_found("counter", full_name))
    }

    pub fn resolve_by_id(&self, id: i32) -> Result<&CounterDescriptor> {
        self.by_id
            .get(&id)
            .ok_or_else(|| CollectorError::not_found("counter id", id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RollupType;
    use crate::testing::{fixture_counters, FixtureApi};

    #[tokio::test]
    async fn test_refresh_indexes_every_counter() {
        let api = FixtureApi::new();
        let catalog = CounterCatalog::refresh(&api).await.unwrap();

        assert_eq!(catalog.len(), fixture_counters().len());
        assert_eq!(catalog.resolve_by_name("mem.consumed.average").unwrap().id, 4);
        assert_eq!(
            catalog.resolve_by_id(9).unwrap().full_name(),
            "virtualDisk.numberReadAveraged.average"
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_propagates() {
        let api = FixtureApi::new().fail_counters();
        let err = CounterCatalog::refresh(&api).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_name_resolution_is_exact() {
        let catalog = CounterCatalog::from_counters(fixture_counters());

        assert!(catalog.resolve_by_name("mem.consumed.average").is_ok());
        assert!(catalog.resolve_by_name("mem.consumed").is_err());
        assert!(catalog.resolve_by_name("MEM.consumed.average").is_err());
        assert!(catalog.resolve_by_name("mem.consumed.latest").is_err());
        assert!(matches!(
            catalog.resolve_by_id(999),
            Err(CollectorError::NotFound { kind: "counter id", .. })
        ));
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = CounterCatalog::default();
        assert!(catalog.is_empty());
        assert!(catalog.resolve_by_name("cpu.usage.average").is_err());
    }

    #[test]
    fn test_duplicate_counters_keep_first_in_both_indexes() {
        let counter = |id: i32, name: &str| CounterDescriptor {
            id,
            group: "mem".to_string(),
            name: name.to_string(),
            rollup_type: RollupType::Average,
        };
        let catalog = CounterCatalog::from_counters(vec![
            counter(4, "consumed"),
            counter(40, "consumed"),
            counter(4, "active"),
        ]);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.resolve_by_name("mem.consumed.average").unwrap().id, 4);
        assert!(catalog.resolve_by_id(40).is_err());
        assert!(catalog.resolve_by_name("mem.active.average").is_err());
        assert_eq!(catalog.resolve_by_id(4).unwrap().full_name(), "mem.consumed.average");
    }
}
