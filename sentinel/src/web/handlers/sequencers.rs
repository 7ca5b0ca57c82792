// Sequencer status and log stream endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use super::common::{ApiResponse, ApiResult};
use crate::sequencer::SequencerStatus;
use crate::web::{AppState, LogLine};

/// Current status of every sequencer, in configured order
pub async fn get_all_sequencers(State(state): State<AppState>) -> ApiResult<Vec<SequencerStatus>> {
    Ok(Json(ApiResponse::success(state.sequencers.statuses().await)))
}

pub async fn get_sequencer(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<SequencerStatus> {
    match state.sequencers.id_by_name(&name) {
        Some(id) => Ok(Json(ApiResponse::success(state.sequencers.status(id).await))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Sequencer '{}' not found", name))),
        )),
    }
}

pub async fn get_logs(State(state): State<AppState>) -> ApiResult<Vec<LogLine>> {
    Ok(Json(ApiResponse::success(state.dashboard.logs().await)))
}
