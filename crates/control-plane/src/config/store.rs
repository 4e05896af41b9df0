//! Storage configuration for the metadata and warehouse databases.

use serde::Deserialize;

/// Storage configuration loaded from environment variables.
///
/// Environment variables are prefixed with `STORE_`:
/// - `STORE_METADATA_URL`: Workflows, run records and schedules
///   (default: "sqlite://autoflow_config.db")
/// - `STORE_WAREHOUSE_URL`: User and materialized tables
///   (default: "sqlite://warehouse.db")
/// - `STORE_MAX_CONNECTIONS`, `STORE_MIN_CONNECTIONS`, `STORE_ACQUIRE_TIMEOUT`
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,

    #[serde(default = "default_warehouse_url")]
    pub warehouse_url: String,

    /// Maximum connections in each pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections in each pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: u64,
}

fn default_metadata_url() -> String {
    "sqlite://autoflow_config.db".to_string()
}

fn default_warehouse_url() -> String {
    "sqlite://warehouse.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `STORE_`.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("STORE_").from_env::<StoreConfig>()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            metadata_url: default_metadata_url(),
            warehouse_url: default_warehouse_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout: default_acquire_timeout(),
        }
    }
}
