//! Threshold Routes

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;

/// Threshold upsert request
#[derive(Debug, Deserialize)]
pub struct ThresholdUpsert {
    pub owner_id: i64,
    pub sensor: String,
    pub parameter: String,
    pub lower: f64,
    pub upper: f64,
}

/// Upsert bounds for one (owner, sensor, parameter)
pub async fn upsert(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ThresholdUpsert>,
) -> StatusCode {
    state.thresholds.upsert(
        request.owner_id,
        &request.sensor,
        &request.parameter,
        request.lower,
        request.upper,
    );
    StatusCode::NO_CONTENT
}
