//! Workflow definition endpoints

use axum::extract::{Path, State};
use tracing::debug;

use super::state::AppState;
use super::types::{ApiError, CreateWorkflowBody, Json};
use crate::domain::Workflow;

/// GET /workflows
pub async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<Vec<Workflow>>, ApiError> {
    debug!("Listing workflows");

    let workflows = state
        .workflow_service
        .list()
        .await
        .map_err(ApiError::from)?;

    Ok(Json(workflows))
}

/// POST /workflows
pub async fn create_workflow(
    State(state): State<AppState>,
    Json(request): Json<CreateWorkflowBody>,
) -> Result<Json<Workflow>, ApiError> {
    debug!(name = %request.name, steps = request.steps.len(), "Creating workflow");

    let workflow = state
        .workflow_service
        .create(request.into_request())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(workflow))
}

/// GET /workflows/{workflow_id}
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<Workflow>, ApiError> {
    debug!(workflow_id = %workflow_id, "Getting workflow");

    let workflow = state
        .workflow_service
        .get(&workflow_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found(format!("Workflow '{}' not found", workflow_id)))?;

    Ok(Json(workflow))
}
