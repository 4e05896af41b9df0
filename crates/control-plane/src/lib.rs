//! AutoFlow Control Plane Library
//!
//! This crate provides the AutoFlow server, handling:
//!
//! - **Workflows**: Save ordered steps of table-transforming code and run them
//! - **Scheduling**: Fire workflows on interval or daily triggers
//! - **Warehouse**: List, load and save tables; ingest CSV files
//! - **Code Generation**: Turn instructions into step code through a provider
//!
//! ## Architecture
//!
//! Two SQLite databases back the server. The metadata store holds workflow
//! definitions, run records and schedule entries; the warehouse holds user
//! tables and the tables materialized by runs. Step code runs in a sandboxed
//! script engine from the `autoflow-tools` crate.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from environment variables
//! - [`db`]: Database connectivity, models and queries
//! - [`engine`]: Dataset context building and run coordination
//! - [`scheduler`]: Triggers and the background ticker
//! - [`codegen`]: Prompt rendering and code providers
//! - [`error`]: Custom error types with Axum integration
//! - [`handlers`]: HTTP route handlers
//! - [`state`]: Shared application state
//!
//! ## Example
//!
//! ```ignore
//! use autoflow_control_plane::{
//!     codegen::GeminiProvider,
//!     config::{AppConfig, GeminiConfig, StoreConfig},
//!     db::create_pool,
//!     routes::build_router,
//!     state::AppState,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = StoreConfig::from_env()?;
//!     let metadata = create_pool(&store.metadata_url, &store).await?;
//!     let warehouse = create_pool(&store.warehouse_url, &store).await?;
//!     let provider = std::sync::Arc::new(GeminiProvider::new(GeminiConfig::from_env()?));
//!     let state = AppState::new(metadata, warehouse, AppConfig::from_env()?, provider);
//!     let app = build_router(state);
//!     // ... serve
//!     Ok(())
//! }
//! ```

pub mod codegen;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod result_ext;
pub mod routes;
pub mod scheduler;
pub mod seed;
pub mod services;
pub mod state;

pub use error::{AppError, AppResult};
pub use result_ext::ResultExt;
