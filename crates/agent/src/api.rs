//! HTTP API for health checks, Prometheus metrics and metric collection

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use vsphere_lib::{
    health::{ComponentStatus, HealthRegistry},
    CollectionBatch, CollectorError, CollectorMetrics, DerivedMetric, VsphereCollector,
};

/// Shared application state
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: CollectorMetrics,
    pub collector: Arc<VsphereCollector>,
    /// Last batch produced by the periodic loop
    pub latest: RwLock<Option<CollectionBatch>>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: CollectorMetrics,
        collector: Arc<VsphereCollector>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            collector,
            latest: RwLock::new(None),
        }
    }

    pub async fn store_batch(&self, batch: CollectionBatch) {
        *self.latest.write().await = Some(batch);
    }
}

#[derive(Debug, Deserialize)]
pub struct CollectRequest {
    pub namespaces: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CollectResponse {
    pub metrics: Vec<DerivedMetric>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Collector failure rendered as an HTTP error
pub struct ApiError(CollectorError);

impl From<CollectorError> for ApiError {
    fn from(err: CollectorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CollectorError::NoMetricsRequested
            | CollectorError::InvalidNamespace { .. }
            | CollectorError::EmptyQuery => StatusCode::BAD_REQUEST,
            CollectorError::NotFound { .. } => StatusCode::NOT_FOUND,
            CollectorError::Transport { .. } | CollectorError::MalformedResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            CollectorError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode Prometheus metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.collector.metric_types())
}

/// One-shot collection of the posted namespaces
async fn collect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CollectRequest>,
) -> Result<Json<CollectResponse>, ApiError> {
    let metrics = state
        .collector
        .collect_namespaces(&request.namespaces)
        .await?;
    Ok(Json(CollectResponse { metrics }))
}

async fn latest(State(state): State<Arc<AppState>>) -> Response {
    match state.latest.read().await.clone() {
        Some(batch) => Json(batch).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no collection cycle has completed yet".to_string(),
                kind: "not_found".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/catalog", get(catalog))
        .route("/api/v1/collect", post(collect))
        .route("/api/v1/latest", get(latest))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
