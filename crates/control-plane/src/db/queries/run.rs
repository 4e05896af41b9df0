//! Run record queries.

use chrono::{DateTime, Utc};

use crate::db::models::{RunRecord, RunStatus};
use crate::db::DbPool;
use crate::error::AppResult;

/// Insert a new run record.
pub async fn insert_run(pool: &DbPool, run: &RunRecord) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO job_runs (id, workflow_id, status, start_time, end_time, output_table, error_msg)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&run.id)
    .bind(&run.workflow_id)
    .bind(run.status.as_str())
    .bind(run.start_time)
    .bind(run.end_time)
    .bind(&run.output_table)
    .bind(&run.error_msg)
    .execute(pool)
    .await?;

    Ok(())
}

/// Move a RUNNING record to its terminal state.
///
/// Returns false if the record is missing or already terminal.
pub async fn finish_run(
    pool: &DbPool,
    id: &str,
    status: RunStatus,
    end_time: DateTime<Utc>,
    output_table: Option<&str>,
    error_msg: Option<&str>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE job_runs
        SET status = ?, end_time = ?, output_table = ?, error_msg = ?
        WHERE id = ? AND status = 'RUNNING'
        "#,
    )
    .bind(status.as_str())
    .bind(end_time)
    .bind(output_table)
    .bind(error_msg)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Get a run record by id.
pub async fn get_run(pool: &DbPool, id: &str) -> AppResult<Option<RunRecord>> {
    let run = sqlx::query_as::<_, RunRecord>(
        r#"
        SELECT id, workflow_id, status, start_time, end_time, output_table, error_msg
        FROM job_runs
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(run)
}

/// Most recent runs of a workflow, newest first.
pub async fn list_runs_by_workflow(
    pool: &DbPool,
    workflow_id: &str,
    limit: i64,
) -> AppResult<Vec<RunRecord>> {
    let runs = sqlx::query_as::<_, RunRecord>(
        r#"
        SELECT id, workflow_id, status, start_time, end_time, output_table, error_msg
        FROM job_runs
        WHERE workflow_id = ?
        ORDER BY start_time DESC
        LIMIT ?
        "#,
    )
    .bind(workflow_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(runs)
}
