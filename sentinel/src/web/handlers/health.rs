// Endpoint health endpoint

use axum::{extract::State, response::Json};

use super::common::{ApiResponse, ApiResult};
use crate::web::{AppState, HealthSummary};

pub async fn get_health(State(state): State<AppState>) -> ApiResult<HealthSummary> {
    let endpoints = state
        .endpoints
        .snapshot()
        .await
        .into_iter()
        .map(|(_, endpoint)| endpoint)
        .collect();

    Ok(Json(ApiResponse::success(HealthSummary {
        monitor: state.sequencers.monitor().await,
        no_endpoints: state.endpoints.no_endpoints(),
        endpoints,
    })))
}
