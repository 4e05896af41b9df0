//! Schedule entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::scheduler::Trigger;

/// Persisted binding of a trigger to a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduleEntry {
    pub id: String,

    pub workflow_id: String,

    #[sqlx(json)]
    pub trigger: Trigger,

    /// Next fire time
    pub next_run: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl ScheduleEntry {
    pub fn new(workflow_id: &str, trigger: Trigger, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            workflow_id: workflow_id.to_string(),
            trigger,
            next_run: trigger.first_fire_after(now),
            created_at: now,
        }
    }
}

/// Request to schedule a workflow.
///
/// `value` is a minute count for `interval` and `HH:MM` for `daily`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub workflow_id: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub value: serde_json::Value,
}

impl ScheduleRequest {
    /// Trigger value as text; numbers are accepted for intervals.
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Schedule listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub id: String,
    pub next_run: String,
    pub workflow_id: String,
    pub trigger: String,
}

impl From<ScheduleEntry> for ScheduleSummary {
    fn from(entry: ScheduleEntry) -> Self {
        Self {
            id: entry.id,
            next_run: entry.next_run.to_rfc3339(),
            workflow_id: entry.workflow_id,
            trigger: entry.trigger.to_string(),
        }
    }
}

/// Response after creating a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCreated {
    pub message: String,
    pub job_id: String,
}
