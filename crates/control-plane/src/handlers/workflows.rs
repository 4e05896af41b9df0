//! Workflow handlers.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::db::models::{
    MessageResponse, RunRecord, WorkflowDefinition, WorkflowSaveRequest, WorkflowSaveResponse,
};
use crate::error::AppResult;
use crate::services::WorkflowService;

/// List saved workflows.
///
/// `GET /workflows`
pub async fn list(State(service): State<WorkflowService>) -> AppResult<Json<Vec<WorkflowDefinition>>> {
    Ok(Json(service.list().await?))
}

/// Save a workflow.
///
/// `POST /workflows`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Month-end recon",
///   "steps": [
///     {"id": "s1", "numericId": 1, "inputIds": [], "code": "df_result = ..."}
///   ]
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "message": "Saved", "id": "1a2b3c4d" }
/// ```
pub async fn create(
    State(service): State<WorkflowService>,
    Json(request): Json<WorkflowSaveRequest>,
) -> AppResult<Json<WorkflowSaveResponse>> {
    Ok(Json(service.create(request).await?))
}

/// Delete a workflow and its schedules.
///
/// `DELETE /workflows/{id}`
pub async fn delete(
    State(service): State<WorkflowService>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    service.delete(&id).await?;
    Ok(Json(MessageResponse::new("Deleted")))
}

/// Run a workflow once and return its terminal run record.
///
/// `POST /workflows/{id}/run`
pub async fn run(
    State(service): State<WorkflowService>,
    Path(id): Path<String>,
) -> AppResult<Json<RunRecord>> {
    Ok(Json(service.run(&id).await?))
}
