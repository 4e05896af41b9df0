//! HTTP route table.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, schedules::ScheduleState};
use crate::state::AppState;

/// Build the application router with permissive CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::api_health))
        .with_state(state.clone());

    let table_routes = Router::new()
        .route("/upload", post(handlers::tables::upload))
        .route("/db/tables", get(handlers::tables::list))
        .route("/db/load", post(handlers::tables::load))
        .route("/db/save", post(handlers::tables::save))
        .with_state(state.tables.clone());

    let transform_routes = Router::new()
        .route("/process_multi", post(handlers::transform::process_multi))
        .route("/execute_multi", post(handlers::transform::execute_multi))
        .with_state(state.transforms.clone());

    let workflow_routes = Router::new()
        .route("/workflows", get(handlers::workflows::list))
        .route("/workflows", post(handlers::workflows::create))
        .route("/workflows/{id}", delete(handlers::workflows::delete))
        .route("/workflows/{id}/run", post(handlers::workflows::run))
        .with_state(state.workflows.clone());

    let schedule_routes = Router::new()
        .route("/schedules", get(handlers::schedules::list))
        .route("/schedules", post(handlers::schedules::create))
        .route("/schedules/{id}", delete(handlers::schedules::delete))
        .route(
            "/schedules/history/{workflow_id}",
            get(handlers::schedules::history),
        )
        .with_state(ScheduleState {
            scheduler: state.scheduler.clone(),
            history_limit: state.config.history_limit,
        });

    Router::new()
        .merge(health_routes)
        .merge(table_routes)
        .merge(transform_routes)
        .merge(workflow_routes)
        .merge(schedule_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
