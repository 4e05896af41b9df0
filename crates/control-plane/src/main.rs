//! AutoFlow Control Plane Server
//!
//! Serves the HTTP API and runs the schedule ticker.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STORE_METADATA_URL=sqlite://autoflow_config.db
//! export STORE_WAREHOUSE_URL=sqlite://warehouse.db
//! export GEMINI_API_KEY=...
//!
//! # Run the server
//! autoflow-control-plane
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autoflow_control_plane::{
    codegen::{CodeProvider, GeminiProvider},
    config::{AppConfig, GeminiConfig, StoreConfig},
    db::{create_pool, schema::init_metadata},
    routes::build_router,
    seed::seed_warehouse,
    state::AppState,
    ResultExt,
};

/// Initialize the tracing subscriber.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,autoflow_control_plane=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting AutoFlow Control Plane"
    );

    let app_config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load app config, using defaults");
        AppConfig::default()
    });

    let store_config = StoreConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load store config, using defaults");
        StoreConfig::default()
    });

    let gemini_config = GeminiConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load Gemini config, using defaults");
        GeminiConfig::default()
    });

    tracing::info!(
        server_name = %app_config.server_name,
        host = %app_config.host,
        port = app_config.port,
        debug = app_config.debug,
        metadata_url = %store_config.metadata_url,
        warehouse_url = %store_config.warehouse_url,
        "Configuration loaded"
    );

    let metadata = create_pool(&store_config.metadata_url, &store_config).await?;
    let warehouse = create_pool(&store_config.warehouse_url, &store_config).await?;
    init_metadata(&metadata).await?;

    if app_config.seed_demo_data {
        // Demo data is a convenience; the server runs without it.
        let _ = seed_warehouse(&warehouse).await.log("seed warehouse");
    }

    let provider = GeminiProvider::new(gemini_config);
    if !provider.is_configured() {
        tracing::warn!("GEMINI_API_KEY not set, code generation requests will fail");
    }

    let tick = app_config.scheduler_tick();
    let state = AppState::new(metadata, warehouse, app_config.clone(), Arc::new(provider));

    let scheduler = state.scheduler.clone();
    let ticker = tokio::spawn(state.scheduler.clone().run(tick));

    let app = build_router(state);

    let addr: SocketAddr = app_config.bind_address().parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    let _ = ticker.await.log("scheduler task");

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
