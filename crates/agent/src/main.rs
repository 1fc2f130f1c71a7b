//! vSphere Agent - periodic vSphere performance collector
//!
//! Collects the configured namespaces on a fixed interval and serves the
//! results alongside health and Prometheus endpoints.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vsphere_agent::{api, config::AgentConfig};
use vsphere_lib::{
    health::{components, HealthRegistry},
    CollectionLoopBuilder, CollectorMetrics, StructuredLogger, VsphereCollector,
};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting vsphere-agent");

    let config = AgentConfig::load()?;
    let requests = config.requests()?;
    let collector = Arc::new(
        VsphereCollector::connect(&config.connection())
            .context("invalid vSphere connection settings")?,
    );
    info!(
        cluster = %config.cluster_name,
        namespaces = requests.len(),
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::COLLECTOR).await;
    health_registry.register(components::VSPHERE_API).await;

    let metrics = CollectorMetrics::new();

    let logger = StructuredLogger::new(&config.cluster_name);
    logger.log_startup(AGENT_VERSION, &config.url, requests.len());

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        collector.clone(),
    ));

    let (shutdown_tx, _) = broadcast::channel(1);

    if requests.is_empty() {
        info!("No namespaces configured, periodic collection disabled");
    } else {
        let (collection_loop, mut batches) = CollectionLoopBuilder::new()
            .collector(collector)
            .requests(requests)
            .health(health_registry.clone())
            .interval(Duration::from_secs(config.collection_interval_secs))
            .build()?;
        tokio::spawn(collection_loop.run(shutdown_tx.subscribe()));

        let state = app_state.clone();
        tokio::spawn(async move {
            while let Some(batch) = batches.recv().await {
                state.store_batch(batch).await;
            }
        });
    }

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}
