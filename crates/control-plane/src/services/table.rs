//! Warehouse table service.
//!
//! Lists, loads and saves warehouse tables and parses uploaded CSV files.

use autoflow_tools::table::MISSING_PLACEHOLDER;
use autoflow_tools::Table;
use serde_json::Value;
use tracing::info;

use crate::db::models::{
    LoadTableRequest, LoadTableResponse, SaveTableRequest, SaveTableResponse, TablesResponse,
    UploadResponse,
};
use crate::db::queries::warehouse;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::ingest::parse_csv;

/// Warehouse table service.
#[derive(Clone)]
pub struct TableService {
    warehouse: DbPool,
    load_row_limit: i64,
}

impl TableService {
    /// Create a new table service. Loads return at most `load_row_limit` rows.
    pub fn new(warehouse: DbPool, load_row_limit: i64) -> Self {
        Self {
            warehouse,
            load_row_limit,
        }
    }

    /// List warehouse tables.
    pub async fn list(&self) -> AppResult<TablesResponse> {
        Ok(TablesResponse {
            tables: warehouse::list_tables(&self.warehouse).await?,
        })
    }

    /// Load the leading rows of a table. Missing values become empty strings.
    pub async fn load(&self, request: LoadTableRequest) -> AppResult<LoadTableResponse> {
        let mut table =
            warehouse::read_table(&self.warehouse, &request.table_name, Some(self.load_row_limit))
                .await?;
        table.fill_missing(&Value::String(String::new()));

        Ok(LoadTableResponse {
            name: request.table_name,
            data: table.to_records(),
        })
    }

    /// Persist records under a sanitized table name.
    pub async fn save(&self, request: SaveTableRequest) -> AppResult<SaveTableResponse> {
        if request.data.is_empty() {
            return Ok(SaveTableResponse {
                message: "No data".to_string(),
                rows: 0,
            });
        }

        let name = warehouse::sanitize_table_name(&request.table_name);
        if name.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Invalid table name: '{}'",
                request.table_name
            )));
        }

        let table = Table::from_records(&request.data);
        let rows = warehouse::write_table(&self.warehouse, &name, &table, request.if_exists).await?;

        info!(table = %name, rows, mode = ?request.if_exists, "Table saved");

        Ok(SaveTableResponse {
            message: format!("Saved '{}'", name),
            rows,
        })
    }

    /// Parse an uploaded CSV file. Missing values become `NaN`.
    pub fn upload(&self, filename: String, bytes: &[u8]) -> AppResult<UploadResponse> {
        let mut table = parse_csv(bytes)?;
        table.fill_missing(&Value::String(MISSING_PLACEHOLDER.to_string()));

        Ok(UploadResponse {
            filename,
            data: table.to_records(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::WriteMode;
    use crate::db::pool::memory_pool;
    use autoflow_tools::Record;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let service = TableService::new(memory_pool().await, 2);

        let response = service
            .save(SaveTableRequest {
                table_name: "my table!".to_string(),
                data: records(json!([
                    {"id": 1, "memo": "a"},
                    {"id": 2, "memo": null},
                    {"id": 3, "memo": "c"}
                ])),
                if_exists: WriteMode::Replace,
            })
            .await
            .unwrap();
        assert_eq!(response.message, "Saved 'mytable'");
        assert_eq!(response.rows, 3);

        assert_eq!(service.list().await.unwrap().tables, vec!["mytable"]);

        let loaded = service
            .load(LoadTableRequest {
                table_name: "mytable".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(loaded.data.len(), 2);
        assert_eq!(loaded.data[1]["memo"], json!(""));
    }

    #[tokio::test]
    async fn test_save_without_data() {
        let service = TableService::new(memory_pool().await, 1000);
        let response = service
            .save(SaveTableRequest {
                table_name: "t".to_string(),
                data: vec![],
                if_exists: WriteMode::Replace,
            })
            .await
            .unwrap();
        assert_eq!(response.message, "No data");
        assert_eq!(response.rows, 0);
        assert!(service.list().await.unwrap().tables.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_table() {
        let service = TableService::new(memory_pool().await, 1000);
        let err = service
            .load(LoadTableRequest {
                table_name: "nope".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_upload_fills_missing() {
        let service = TableService::new(memory_pool().await, 1000);
        let response = service
            .upload("gl.csv".to_string(), b"id,amount\n1,\n2,3.5\n")
            .unwrap();
        assert_eq!(response.filename, "gl.csv");
        assert_eq!(response.data[0]["amount"], json!("NaN"));
        assert_eq!(response.data[1]["amount"], json!(3.5));
    }
}
