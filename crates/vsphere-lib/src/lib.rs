//! vSphere performance counter collection
//!
//! This crate provides the core functionality for:
//! - Parsing metric namespaces and mapping them to vSphere counters
//! - Building batched per-entity performance queries
//! - Reassembling query responses into named, unit-converted metrics
//! - The periodic collection loop, health checks and observability

pub mod api;
pub mod catalog;
pub mod collector;
pub mod config;
pub mod definitions;
pub mod error;
pub mod health;
pub mod inventory;
pub mod models;
pub mod namespace;
pub mod observability;
pub mod parser;
pub mod projector;
pub mod query;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{HttpPerfApi, PerfApi};
pub use collector::{parse_namespaces, CollectionLoop, CollectionLoopBuilder, VsphereCollector};
pub use config::ConnectionConfig;
pub use definitions::MetricType;
pub use error::{CollectorError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use namespace::MetricRequest;
pub use observability::{CollectorMetrics, StructuredLogger};
