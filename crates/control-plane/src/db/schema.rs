//! Metadata schema.

use crate::db::DbPool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS workflows (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        steps TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_runs (
        id TEXT PRIMARY KEY,
        workflow_id TEXT NOT NULL,
        status TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT,
        output_table TEXT,
        error_msg TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_job_runs_workflow ON job_runs (workflow_id, start_time)",
    r#"
    CREATE TABLE IF NOT EXISTS schedules (
        id TEXT PRIMARY KEY,
        workflow_id TEXT NOT NULL,
        trigger TEXT NOT NULL,
        next_run TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_schedules_next_run ON schedules (next_run)",
];

/// Create the metadata tables if they do not exist.
pub async fn init_metadata(pool: &DbPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("Metadata schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::memory_pool;

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let pool = memory_pool().await;
        tokio_test::assert_ok!(init_metadata(&pool).await);
        tokio_test::assert_ok!(init_metadata(&pool).await);

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(names, vec!["job_runs", "schedules", "workflows"]);
    }
}
