//! Health check endpoints for the AutoFlow control plane API.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::db::pool::health_check as db_health_check;
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Health status ("ok" or "unhealthy")
    pub status: String,
}

/// Detailed health check response for the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealthResponse {
    /// Overall health status
    pub status: String,

    /// Metadata store connectivity
    pub metadata: String,

    /// Warehouse connectivity
    pub warehouse: String,

    /// Whether a code provider key is configured
    pub code_generation: bool,

    /// Server uptime in seconds
    pub uptime_seconds: u64,

    /// Server version
    pub version: String,
}

fn connectivity(healthy: bool) -> String {
    if healthy { "connected" } else { "disconnected" }.to_string()
}

/// Basic health check endpoint.
///
/// `GET /health`
///
/// Returns quickly without touching storage, for load balancer checks.
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
    })
}

/// Detailed health check endpoint.
///
/// `GET /api/health`
///
/// - `200 OK` when both databases answer
/// - `503 Service Unavailable` otherwise
pub async fn api_health(State(state): State<AppState>) -> (StatusCode, Json<ApiHealthResponse>) {
    let metadata_healthy = db_health_check(&state.metadata).await;
    let warehouse_healthy = db_health_check(&state.warehouse).await;
    let healthy = metadata_healthy && warehouse_healthy;

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = ApiHealthResponse {
        status: if healthy { "ok" } else { "unhealthy" }.to_string(),
        metadata: connectivity(metadata_healthy),
        warehouse: connectivity(warehouse_healthy),
        code_generation: state.transforms.can_generate(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        assert_eq!(response.status, "ok");
    }
}
