//! Workflow definition queries.

use sqlx::types::Json;

use crate::db::models::WorkflowDefinition;
use crate::db::DbPool;
use crate::error::AppResult;

/// Insert a new workflow definition.
pub async fn insert_workflow(pool: &DbPool, workflow: &WorkflowDefinition) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO workflows (id, name, steps, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&workflow.id)
    .bind(&workflow.name)
    .bind(Json(&workflow.steps))
    .bind(workflow.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// List all workflows, oldest first.
pub async fn list_workflows(pool: &DbPool) -> AppResult<Vec<WorkflowDefinition>> {
    let workflows = sqlx::query_as::<_, WorkflowDefinition>(
        r#"
        SELECT id, name, steps, created_at
        FROM workflows
        ORDER BY created_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(workflows)
}

/// Get a workflow by id.
pub async fn get_workflow(pool: &DbPool, id: &str) -> AppResult<Option<WorkflowDefinition>> {
    let workflow = sqlx::query_as::<_, WorkflowDefinition>(
        r#"
        SELECT id, name, steps, created_at
        FROM workflows
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(workflow)
}

/// Delete a workflow. Returns whether it existed.
pub async fn delete_workflow(pool: &DbPool, id: &str) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
