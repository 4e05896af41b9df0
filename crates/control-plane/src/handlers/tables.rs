//! Warehouse table handlers.

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::db::models::{
    LoadTableRequest, LoadTableResponse, SaveTableRequest, SaveTableResponse, TablesResponse,
    UploadResponse,
};
use crate::error::{AppError, AppResult};
use crate::services::TableService;

/// List warehouse tables.
///
/// `GET /db/tables`
pub async fn list(State(service): State<TableService>) -> AppResult<Json<TablesResponse>> {
    Ok(Json(service.list().await?))
}

/// Load the leading rows of a table.
///
/// `POST /db/load`
///
/// # Request Body
///
/// ```json
/// { "table_name": "gl_transactions" }
/// ```
pub async fn load(
    State(service): State<TableService>,
    Json(request): Json<LoadTableRequest>,
) -> AppResult<Json<LoadTableResponse>> {
    Ok(Json(service.load(request).await?))
}

/// Save records as a table.
///
/// `POST /db/save`
///
/// # Request Body
///
/// ```json
/// {
///   "table_name": "recon_result",
///   "data": [{"txn_id": "GL-1001", "difference": 0.0}],
///   "if_exists": "replace"
/// }
/// ```
pub async fn save(
    State(service): State<TableService>,
    Json(request): Json<SaveTableRequest>,
) -> AppResult<Json<SaveTableResponse>> {
    Ok(Json(service.save(request).await?))
}

/// Parse an uploaded CSV file into records.
///
/// `POST /upload` (multipart, field `file`)
pub async fn upload(
    State(service): State<TableService>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok(Json(service.upload(filename, &bytes)?));
    }

    Err(AppError::BadRequest("Missing 'file' field".to_string()))
}
