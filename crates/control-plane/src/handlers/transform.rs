//! Ad-hoc transformation handlers.

use axum::{extract::State, Json};

use crate::db::models::{ExecuteMultiRequest, ProcessMultiRequest, TransformResponse};
use crate::error::AppResult;
use crate::services::TransformService;

/// Generate code from a prompt and run it against the given datasets.
///
/// `POST /process_multi`
///
/// # Request Body
///
/// ```json
/// {
///   "datasets": {"df_gl": [...], "df_bank": [...]},
///   "prompt": "Reconcile on txn_id",
///   "task_type": "RECON"
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "result": [...], "code": "..." }
/// ```
pub async fn process_multi(
    State(service): State<TransformService>,
    Json(request): Json<ProcessMultiRequest>,
) -> AppResult<Json<TransformResponse>> {
    Ok(Json(service.process_multi(request).await?))
}

/// Run supplied code against the given datasets.
///
/// `POST /execute_multi`
pub async fn execute_multi(
    State(service): State<TransformService>,
    Json(request): Json<ExecuteMultiRequest>,
) -> AppResult<Json<TransformResponse>> {
    Ok(Json(service.execute_multi(request).await?))
}
