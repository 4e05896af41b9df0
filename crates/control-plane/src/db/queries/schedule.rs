//! Schedule entry queries.

use chrono::{DateTime, Utc};
use sqlx::types::Json;

use crate::db::models::ScheduleEntry;
use crate::db::DbPool;
use crate::error::AppResult;

/// Insert a new schedule entry.
pub async fn insert_schedule(pool: &DbPool, entry: &ScheduleEntry) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO schedules (id, workflow_id, trigger, next_run, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.workflow_id)
    .bind(Json(&entry.trigger))
    .bind(entry.next_run)
    .bind(entry.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// List all schedule entries by next fire time.
pub async fn list_schedules(pool: &DbPool) -> AppResult<Vec<ScheduleEntry>> {
    let entries = sqlx::query_as::<_, ScheduleEntry>(
        r#"
        SELECT id, workflow_id, trigger, next_run, created_at
        FROM schedules
        ORDER BY next_run
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Entries whose next fire time is not after `now`.
pub async fn list_due(pool: &DbPool, now: DateTime<Utc>) -> AppResult<Vec<ScheduleEntry>> {
    let entries = sqlx::query_as::<_, ScheduleEntry>(
        r#"
        SELECT id, workflow_id, trigger, next_run, created_at
        FROM schedules
        WHERE next_run <= ?
        ORDER BY next_run
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Set the next fire time of an entry.
pub async fn update_next_run(pool: &DbPool, id: &str, next_run: DateTime<Utc>) -> AppResult<()> {
    sqlx::query("UPDATE schedules SET next_run = ? WHERE id = ?")
        .bind(next_run)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete an entry. Returns whether it existed.
pub async fn delete_schedule(pool: &DbPool, id: &str) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM schedules WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every entry bound to a workflow. Returns the number removed.
pub async fn delete_by_workflow(pool: &DbPool, workflow_id: &str) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM schedules WHERE workflow_id = ?")
        .bind(workflow_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::memory_pool;
    use crate::db::schema::init_metadata;
    use crate::scheduler::Trigger;
    use chrono::{Duration, Timelike};

    #[tokio::test]
    async fn test_due_and_delete_by_workflow() {
        let pool = memory_pool().await;
        init_metadata(&pool).await.unwrap();

        let now = Utc::now();
        let a = ScheduleEntry::new("wf", Trigger::Interval { minutes: 1 }, now);
        let far_hour = (now.hour() + 12) % 24;
        let b = ScheduleEntry::new("wf", Trigger::Daily { hour: far_hour, minute: 0 }, now);
        let c = ScheduleEntry::new("other", Trigger::Interval { minutes: 5 }, now);
        for entry in [&a, &b, &c] {
            insert_schedule(&pool, entry).await.unwrap();
        }

        assert!(list_due(&pool, now).await.unwrap().is_empty());
        let due = list_due(&pool, now + Duration::minutes(2)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, a.id);
        assert_eq!(due[0].trigger, Trigger::Interval { minutes: 1 });

        update_next_run(&pool, &a.id, now + Duration::minutes(10)).await.unwrap();
        assert!(list_due(&pool, now + Duration::minutes(2)).await.unwrap().is_empty());

        assert_eq!(delete_by_workflow(&pool, "wf").await.unwrap(), 2);
        let remaining = list_schedules(&pool).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, c.id);

        assert!(delete_schedule(&pool, &c.id).await.unwrap());
        assert!(!delete_schedule(&pool, &c.id).await.unwrap());
    }
}
