//! Telemetry Pipeline API Server
//!
//! REST surface over the ingestion core: bulk intake, threshold upserts,
//! stored-measurement queries, health, and metrics exposition.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::Arc;
use thresholds::ThresholdRegister;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod routes;

pub use self::config::{PipelineConfig, ServerConfig};

use intake::IntakeService;
use storage::MeasurementStore;

/// Application state shared across handlers
pub struct AppState {
    /// Ingestion path
    pub intake: IntakeService,
    /// Store handle for query/health
    pub store: Arc<dyn MeasurementStore>,
    /// Threshold register
    pub thresholds: Arc<ThresholdRegister>,
    /// Prometheus render handle
    pub metrics: PrometheusHandle,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create application state and install the metrics recorder.
    pub fn new(
        intake: IntakeService,
        store: Arc<dyn MeasurementStore>,
        thresholds: Arc<ThresholdRegister>,
    ) -> Result<Self, BuildError> {
        let metrics = PrometheusBuilder::new().install_recorder()?;
        Ok(Self {
            intake,
            store,
            thresholds,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        })
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub measurement_count: usize,
    pub threshold_count: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/data", post(routes::ingest::ingest))
        .route("/api/v1/thresholds", put(routes::thresholds::upsert))
        .route("/api/v1/measurements", get(routes::measurements::query))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let measurement_count = state
        .store
        .scan_since(0)
        .map(|rows| rows.len())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        measurement_count,
        threshold_count: state.thresholds.len(),
    })
}

/// Prometheus exposition handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Serve the router until the process receives an interrupt.
pub async fn run_server(addr: &str, state: Arc<AppState>) -> std::io::Result<()> {
    let app = create_router(state);

    info!("Starting API server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("interrupt received, shutting down");
}

/// Map an intake failure to a client or retryable status.
pub(crate) fn intake_error_response(error: intake::IntakeError) -> axum::response::Response {
    let status = match &error {
        intake::IntakeError::InvalidDocument(_) => StatusCode::BAD_REQUEST,
        intake::IntakeError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
        }),
    )
        .into_response()
}
