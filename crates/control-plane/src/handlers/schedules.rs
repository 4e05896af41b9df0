//! Schedule handlers.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::db::models::{MessageResponse, RunRecord, ScheduleCreated, ScheduleRequest, ScheduleSummary};
use crate::error::AppResult;
use crate::scheduler::SchedulerService;

/// Run history is bounded by configuration, carried alongside the service.
#[derive(Clone)]
pub struct ScheduleState {
    pub scheduler: SchedulerService,
    pub history_limit: i64,
}

/// List schedule entries.
///
/// `GET /schedules`
pub async fn list(State(state): State<ScheduleState>) -> AppResult<Json<Vec<ScheduleSummary>>> {
    Ok(Json(state.scheduler.list().await?))
}

/// Schedule a workflow.
///
/// `POST /schedules`
///
/// # Request Body
///
/// ```json
/// { "workflow_id": "1a2b3c4d", "type": "interval", "value": "15" }
/// ```
///
/// or
///
/// ```json
/// { "workflow_id": "1a2b3c4d", "type": "daily", "value": "09:30" }
/// ```
pub async fn create(
    State(state): State<ScheduleState>,
    Json(request): Json<ScheduleRequest>,
) -> AppResult<Json<ScheduleCreated>> {
    Ok(Json(state.scheduler.create(request).await?))
}

/// Remove a schedule entry.
///
/// `DELETE /schedules/{id}`
pub async fn delete(
    State(state): State<ScheduleState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.scheduler.delete(&id).await?;
    Ok(Json(MessageResponse::new("Schedule removed")))
}

/// Most recent runs of a workflow, newest first.
///
/// `GET /schedules/history/{workflow_id}`
pub async fn history(
    State(state): State<ScheduleState>,
    Path(workflow_id): Path<String>,
) -> AppResult<Json<Vec<RunRecord>>> {
    Ok(Json(
        state
            .scheduler
            .history(&workflow_id, state.history_limit)
            .await?,
    ))
}
