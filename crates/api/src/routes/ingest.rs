//! Intake Route

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::{intake_error_response, AppState};

/// Bulk intake request: one owner, a batch of records
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Identity of the reporting principal
    pub owner_id: i64,
    /// Nested telemetry records, each with its own shared timestamp
    pub data: Vec<Value>,
}

/// Response counts
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub inserted: usize,
    pub threshold_alerts: usize,
}

/// Ingest a batch of telemetry documents
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> axum::response::Response {
    match state.intake.ingest_batch(request.owner_id, &request.data) {
        Ok(report) => (
            StatusCode::CREATED,
            Json(IngestResponse {
                inserted: report.inserted,
                threshold_alerts: report.threshold_alerts,
            }),
        )
            .into_response(),
        Err(error) => intake_error_response(error),
    }
}
