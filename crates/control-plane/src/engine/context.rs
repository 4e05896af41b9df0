//! Dataset context construction from the warehouse.

use autoflow_tools::{dataset_key, DatasetContext};
use tracing::debug;

use crate::db::queries::warehouse;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::result_ext::ResultExt;

/// Table name prefixes owned by runs. Tables carrying them are never
/// exposed to step code.
pub const RESERVED_PREFIXES: &[&str] = &["run_", "temp_", "final_"];

/// Whether a table is a user dataset rather than run output.
pub fn is_dataset_table(name: &str) -> bool {
    !RESERVED_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Load every user table in full as `df_{table}`.
///
/// A table that fails to read is logged and left out.
pub async fn build_dataset_context(pool: &DbPool) -> AppResult<DatasetContext> {
    let mut ctx = DatasetContext::new();

    for name in warehouse::list_tables(pool).await? {
        if !is_dataset_table(&name) {
            continue;
        }

        let table = warehouse::read_table(pool, &name, None)
            .await
            .map_err(|e| AppError::TableRead {
                table: name.clone(),
                message: e.to_string(),
            })
            .log_skip("build dataset context");

        if let Some(table) = table {
            ctx.insert(dataset_key(&name), table);
        }
    }

    debug!(datasets = ?ctx.names(), "Dataset context built");

    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::WriteMode;
    use crate::db::pool::memory_pool;
    use autoflow_tools::Table;
    use serde_json::json;

    #[test]
    fn test_reserved_prefixes() {
        assert!(is_dataset_table("gl_transactions"));
        assert!(!is_dataset_table("run_1_step_1"));
        assert!(!is_dataset_table("temp_x"));
        assert!(!is_dataset_table("final_report"));
    }

    #[tokio::test]
    async fn test_context_excludes_run_tables() {
        let pool = memory_pool().await;
        let table = Table::from_series("amount", vec![json!(1), json!(2)]);
        warehouse::write_table(&pool, "gl_transactions", &table, WriteMode::Replace)
            .await
            .unwrap();
        warehouse::write_table(&pool, "run_1_step_1", &table, WriteMode::Replace)
            .await
            .unwrap();

        let ctx = build_dataset_context(&pool).await.unwrap();
        assert_eq!(ctx.names(), vec!["df_gl_transactions"]);
        assert_eq!(ctx.get("df_gl_transactions").unwrap().num_rows(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_table_is_skipped() {
        let pool = memory_pool().await;
        let table = Table::from_series("amount", vec![json!(1)]);
        warehouse::write_table(&pool, "good", &table, WriteMode::Replace)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE bad (memo TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO bad (memo) VALUES (CAST(x'fffe' AS TEXT))")
            .execute(&pool)
            .await
            .unwrap();

        assert!(warehouse::read_table(&pool, "bad", None).await.is_err());

        let ctx = build_dataset_context(&pool).await.unwrap();
        assert_eq!(ctx.names(), vec!["df_good"]);
    }

    #[tokio::test]
    async fn test_empty_warehouse() {
        let pool = memory_pool().await;
        let ctx = build_dataset_context(&pool).await.unwrap();
        assert!(ctx.is_empty());
    }
}
