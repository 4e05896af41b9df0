//! Warehouse table request and response models.

use autoflow_tools::Record;
use serde::{Deserialize, Serialize};

/// How a write treats an existing table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Drop and recreate the table
    #[default]
    Replace,
    /// Add rows, creating the table or new columns as needed
    Append,
}

/// Response listing warehouse tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

/// Request to load rows of a table.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadTableRequest {
    pub table_name: String,
}

/// Loaded rows of a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadTableResponse {
    pub name: String,
    pub data: Vec<Record>,
}

/// Request to persist records as a table.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveTableRequest {
    pub table_name: String,

    #[serde(default)]
    pub data: Vec<Record>,

    #[serde(default)]
    pub if_exists: WriteMode,
}

/// Response after saving a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveTableResponse {
    pub message: String,
    pub rows: u64,
}

/// Parsed CSV upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub data: Vec<Record>,
}
