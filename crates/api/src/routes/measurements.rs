//! Measurement Query Route

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{MeasurementFilter, QueryOrder};
use telemetry::Measurement;

use crate::{AppState, ErrorBody};

/// Query parameters for the measurements endpoint
#[derive(Debug, Deserialize)]
pub struct MeasurementQuery {
    /// Filter by owner
    pub owner_id: Option<i64>,
    /// Filter by sensor name
    pub sensor: Option<String>,
    /// Filter by parameter path
    pub parameter: Option<String>,
    /// Row ordering (`newest_first` or `oldest_first`)
    #[serde(default)]
    pub order: QueryOrder,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// Response for the measurements endpoint
#[derive(Debug, Serialize)]
pub struct MeasurementResponse {
    pub count: usize,
    pub data: Vec<Measurement>,
}

/// Get stored measurements
pub async fn query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MeasurementQuery>,
) -> axum::response::Response {
    let filter = MeasurementFilter {
        owner_id: params.owner_id,
        sensor: params.sensor,
        parameter: params.parameter,
    };
    let limit = params.limit.min(1000);

    match state.store.query(&filter, params.order, limit) {
        Ok(data) => Json(MeasurementResponse {
            count: data.len(),
            data,
        })
        .into_response(),
        Err(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                error: error.to_string(),
            }),
        )
            .into_response(),
    }
}
