//! Health tracking for the collector
//!
//! Component status map backing the agent's liveness and readiness
//! probes. Collection outcomes feed it through [`HealthRegistry::record_cycle`].

use crate::error::{CollectorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive failed cycles after which the collector is reported unhealthy
pub const UNHEALTHY_AFTER_FAILURES: u32 = 3;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Failing but not yet given up on
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }

    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across all components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const COLLECTOR: &str = "collector";
    pub const VSPHERE_API: &str = "vsphere_api";
}

/// Health registry shared between the collection loop and the HTTP probes
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
    consecutive_failures: Arc<RwLock<u32>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
            consecutive_failures: Arc::new(RwLock::new(0)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        let mut r = self.ready.write().await;
        *r = ready;
    }

    /// Fold a collection cycle outcome into the collector and API statuses
    ///
    /// A success resets both components. Failures degrade the collector
    /// until [`UNHEALTHY_AFTER_FAILURES`] in a row, at which point it is
    /// reported unhealthy. Failures talking to vSphere mark the API unhealthy
    /// immediately.
    pub async fn record_cycle<T>(&self, outcome: &Result<T>) {
        match outcome {
            Ok(_) => {
                *self.consecutive_failures.write().await = 0;
                self.set_healthy(components::COLLECTOR).await;
                self.set_healthy(components::VSPHERE_API).await;
            }
            Err(err) => {
                let failures = {
                    let mut failures = self.consecutive_failures.write().await;
                    *failures += 1;
                    *failures
                };
                let message = format!("{} ({} consecutive failures)", err, failures);
                if failures >= UNHEALTHY_AFTER_FAILURES {
                    self.set_unhealthy(components::COLLECTOR, message).await;
                } else {
                    self.set_degraded(components::COLLECTOR, message).await;
                }
                if err.is_provider_failure() {
                    self.set_unhealthy(components::VSPHERE_API, err.to_string())
                        .await;
                }
            }
        }
    }

    pub async fn consecutive_failures(&self) -> u32 {
        *self.consecutive_failures.read().await
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Collector not yet initialized".to_string()),
            }
        } else if health.status == ComponentStatus::Unhealthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry() -> HealthRegistry {
        let registry = HealthRegistry::new();
        registry.register(components::COLLECTOR).await;
        registry.register(components::VSPHERE_API).await;
        registry
    }

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_failures_degrade_then_fail_collector() {
        let registry = registry().await;
        let failure: Result<()> = Err(CollectorError::not_found("host", "9.9.9.9"));

        registry.record_cycle(&failure).await;
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[components::VSPHERE_API].status,
            ComponentStatus::Healthy
        );

        for _ in 1..UNHEALTHY_AFTER_FAILURES {
            registry.record_cycle(&failure).await;
        }
        assert_eq!(registry.consecutive_failures().await, UNHEALTHY_AFTER_FAILURES);
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_provider_failures_mark_api_unhealthy() {
        for err in [
            CollectorError::transport("performance query", "refused"),
            CollectorError::malformed("2 values for counter 4"),
        ] {
            let registry = registry().await;
            let failure: Result<()> = Err(err);

            registry.record_cycle(&failure).await;
            let health = registry.health().await;
            assert_eq!(
                health.components[components::COLLECTOR].status,
                ComponentStatus::Degraded
            );
            assert_eq!(
                health.components[components::VSPHERE_API].status,
                ComponentStatus::Unhealthy
            );
        }
    }

    #[tokio::test]
    async fn test_success_resets_failures() {
        let registry = registry().await;
        let failure: Result<()> = Err(CollectorError::transport("performance query", "refused"));
        registry.record_cycle(&failure).await;
        registry.record_cycle(&failure).await;

        registry.record_cycle(&Ok(12)).await;
        assert_eq!(registry.consecutive_failures().await, 0);
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_readiness_not_ready_when_unhealthy() {
        let registry = registry().await;
        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        registry
            .set_unhealthy(components::VSPHERE_API, "connection refused")
            .await;
        assert!(!registry.readiness().await.ready);
    }
}
