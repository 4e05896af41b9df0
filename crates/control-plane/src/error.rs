//! Error types for the AutoFlow control plane.
//!
//! This module provides custom error types that implement `IntoResponse`
//! for seamless integration with Axum handlers.

use autoflow_tools::StepError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors for the control plane.
#[derive(Error, Debug)]
pub enum AppError {
    /// Metadata or warehouse storage failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// The workflow of a run does not exist
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Not found error
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad request error
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The code provider failed or is not configured
    #[error("Code generation failed: {0}")]
    CodeGeneration(String),

    /// Step code failed or produced no result
    #[error(transparent)]
    Step(#[from] StepError),

    /// A warehouse table could not be read
    #[error("Failed to read table '{table}': {message}")]
    TableRead { table: String, message: String },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Template rendering error
    #[error("Template error: {0}")]
    Template(String),

    /// Parse error (CSV, JSON, etc.)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl AppError {
    /// HTTP status for this error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::WorkflowNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::Step(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) | AppError::Parse(_) => StatusCode::BAD_REQUEST,
            AppError::CodeGeneration(_) => StatusCode::BAD_GATEWAY,
            AppError::TableRead { .. }
            | AppError::Internal(_)
            | AppError::Config(_)
            | AppError::Serialization(_)
            | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Persistence(e) => {
                tracing::error!(error = %e, "Persistence error");
                self.to_string()
            }
            AppError::NotFound(msg) | AppError::Validation(msg) | AppError::BadRequest(msg) => {
                msg.clone()
            }
            AppError::WorkflowNotFound(_) | AppError::TableRead { .. } => self.to_string(),
            AppError::CodeGeneration(msg) => {
                tracing::warn!(error = %msg, "Code generation error");
                self.to_string()
            }
            AppError::Step(e) => {
                tracing::warn!(error = %e, "Step error");
                e.to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                msg.clone()
            }
            AppError::Config(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                msg.clone()
            }
            AppError::Serialization(e) => {
                tracing::error!(error = %e, "Serialization error");
                self.to_string()
            }
            AppError::Template(msg) => {
                tracing::error!(error = %msg, "Template error");
                msg.clone()
            }
            AppError::Parse(msg) => {
                tracing::warn!(error = %msg, "Parse error");
                self.to_string()
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<envy::Error> for AppError {
    fn from(err: envy::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        AppError::Template(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = AppError::NotFound("Job not found".to_string());
        assert_eq!(err.to_string(), "Resource not found: Job not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_step_error_is_transparent() {
        let err: AppError = StepError::MissingResult("df_result".to_string()).into();
        assert_eq!(err.to_string(), "Code executed but 'df_result' was not created");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_workflow_not_found_error() {
        let err = AppError::WorkflowNotFound("abc12345".to_string());
        assert_eq!(err.to_string(), "Workflow not found: abc12345");
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = AppError::CodeGeneration("no key".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Code generation failed: no key");
        assert_eq!(body["status"], 502);
    }
}
