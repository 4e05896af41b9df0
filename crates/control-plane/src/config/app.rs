//! Application configuration for the AutoFlow control plane.

use autoflow_tools::ExecutorLimits;
use serde::Deserialize;
use std::time::Duration;

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `AUTOFLOW_`:
/// - `AUTOFLOW_HOST`: Server bind address (default: "0.0.0.0")
/// - `AUTOFLOW_PORT`: Server port (default: 8000)
/// - `AUTOFLOW_DEBUG`: Enable debug mode (default: false)
/// - `AUTOFLOW_SERVER_NAME`: Server name for identification
/// - `AUTOFLOW_SCHEDULER_TICK_SECONDS`: Schedule poll interval (default: 5)
/// - `AUTOFLOW_MISFIRE_GRACE_SECONDS`: Lateness tolerated for a firing (default: 3600)
/// - `AUTOFLOW_HISTORY_LIMIT`: Run records returned by the history endpoint (default: 20)
/// - `AUTOFLOW_LOAD_ROW_LIMIT`: Rows returned by `/db/load` (default: 1000)
/// - `AUTOFLOW_SEED_DEMO_DATA`: Recreate the demo tables at startup (default: true)
/// - `AUTOFLOW_MAX_OPERATIONS`, `AUTOFLOW_STEP_TIMEOUT_SECONDS`,
///   `AUTOFLOW_MAX_CALL_LEVELS`, `AUTOFLOW_MAX_STRING_SIZE`,
///   `AUTOFLOW_MAX_ARRAY_SIZE`, `AUTOFLOW_MAX_MAP_SIZE`,
///   `AUTOFLOW_MAX_TABLE_ROWS`: step sandbox limits
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable debug mode
    #[serde(default)]
    pub debug: bool,

    /// Server name for identification
    #[serde(default = "default_server_name")]
    pub server_name: String,

    #[serde(default = "default_tick_seconds")]
    pub scheduler_tick_seconds: u64,

    #[serde(default = "default_grace_seconds")]
    pub misfire_grace_seconds: u64,

    #[serde(default = "default_history_limit")]
    pub history_limit: i64,

    #[serde(default = "default_load_row_limit")]
    pub load_row_limit: i64,

    #[serde(default = "default_true")]
    pub seed_demo_data: bool,

    #[serde(default = "default_max_operations")]
    pub max_operations: u64,

    #[serde(default = "default_step_timeout")]
    pub step_timeout_seconds: u64,

    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    #[serde(default = "default_max_string_size")]
    pub max_string_size: usize,

    #[serde(default = "default_max_array_size")]
    pub max_array_size: usize,

    #[serde(default = "default_max_map_size")]
    pub max_map_size: usize,

    #[serde(default = "default_max_table_rows")]
    pub max_table_rows: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_server_name() -> String {
    "autoflow-control-plane".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tick_seconds() -> u64 {
    5
}

fn default_grace_seconds() -> u64 {
    3600
}

fn default_history_limit() -> i64 {
    20
}

fn default_load_row_limit() -> i64 {
    1000
}

fn default_max_operations() -> u64 {
    ExecutorLimits::default().max_operations
}

fn default_step_timeout() -> u64 {
    ExecutorLimits::default().timeout.as_secs()
}

fn default_max_call_levels() -> usize {
    ExecutorLimits::default().max_call_levels
}

fn default_max_string_size() -> usize {
    ExecutorLimits::default().max_string_size
}

fn default_max_array_size() -> usize {
    ExecutorLimits::default().max_array_size
}

fn default_max_map_size() -> usize {
    ExecutorLimits::default().max_map_size
}

fn default_max_table_rows() -> usize {
    ExecutorLimits::default().max_table_rows
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `AUTOFLOW_`.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("AUTOFLOW_").from_env::<AppConfig>()
    }

    /// Get the server bind address as a string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Sandbox limits for step execution.
    pub fn executor_limits(&self) -> ExecutorLimits {
        ExecutorLimits {
            max_operations: self.max_operations,
            timeout: Duration::from_secs(self.step_timeout_seconds),
            max_call_levels: self.max_call_levels,
            max_string_size: self.max_string_size,
            max_array_size: self.max_array_size,
            max_map_size: self.max_map_size,
            max_table_rows: self.max_table_rows,
            ..ExecutorLimits::default()
        }
    }

    pub fn scheduler_tick(&self) -> Duration {
        Duration::from_secs(self.scheduler_tick_seconds.max(1))
    }

    pub fn misfire_grace(&self) -> Duration {
        Duration::from_secs(self.misfire_grace_seconds)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            server_name: default_server_name(),
            scheduler_tick_seconds: default_tick_seconds(),
            misfire_grace_seconds: default_grace_seconds(),
            history_limit: default_history_limit(),
            load_row_limit: default_load_row_limit(),
            seed_demo_data: true,
            max_operations: default_max_operations(),
            step_timeout_seconds: default_step_timeout(),
            max_call_levels: default_max_call_levels(),
            max_string_size: default_max_string_size(),
            max_array_size: default_max_array_size(),
            max_map_size: default_max_map_size(),
            max_table_rows: default_max_table_rows(),
        }
    }
}
