//! Run trigger and inspection endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::debug;

use super::state::AppState;
use super::types::{ApiError, Json, RunTriggeredResponse};
use crate::domain::{Run, RunHistoryEntry};

/// POST /run/{workflow_id}
pub async fn trigger_run(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<(StatusCode, Json<RunTriggeredResponse>), ApiError> {
    debug!(workflow_id = %workflow_id, "Triggering run");

    let run = state
        .run_service
        .trigger(&workflow_id)
        .await
        .map_err(ApiError::from)?;

    let response = RunTriggeredResponse {
        run_id: run.id().to_string(),
        status: run.status(),
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /run/{run_id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<Run>, ApiError> {
    debug!(run_id = %run_id, "Getting run");

    let run = state
        .run_service
        .get(&run_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found(format!("Run '{}' not found", run_id)))?;

    Ok(Json(run))
}

/// GET /history
pub async fn list_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<RunHistoryEntry>>, ApiError> {
    debug!("Listing run history");

    let runs = state
        .run_service
        .list_recent()
        .await
        .map_err(ApiError::from)?;

    Ok(Json(runs))
}
