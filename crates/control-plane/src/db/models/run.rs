//! Run record model.
//!
//! A run record is created RUNNING when a workflow run starts and moves
//! exactly once to COMPLETED or FAILED.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for RunStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "RUNNING" => Ok(RunStatus::Running),
            "COMPLETED" => Ok(RunStatus::Completed),
            "FAILED" => Ok(RunStatus::Failed),
            other => Err(format!("Unknown run status: {}", other)),
        }
    }
}

/// Audit record of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RunRecord {
    /// Time-derived id, prefixed `run_`
    pub id: String,

    pub workflow_id: String,

    #[sqlx(try_from = "String")]
    pub status: RunStatus,

    pub start_time: DateTime<Utc>,

    /// Set on the terminal transition
    pub end_time: Option<DateTime<Utc>>,

    /// Final materialized table of a completed run
    pub output_table: Option<String>,

    /// Failure message of a failed run
    pub error_msg: Option<String>,
}

impl RunRecord {
    /// New RUNNING record starting at `now`.
    pub fn start(workflow_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: new_run_id(now),
            workflow_id: workflow_id.to_string(),
            status: RunStatus::Running,
            start_time: now,
            end_time: None,
            output_table: None,
            error_msg: None,
        }
    }

    /// Name of the table materializing a step's output.
    pub fn step_table(&self, numeric_id: i64) -> String {
        format!("{}_step_{}", self.id, numeric_id)
    }

    /// Name of the table aliasing the last step's output.
    pub fn final_table(&self) -> String {
        format!("{}_final", self.id)
    }
}

/// Run id: `run_` plus the UTC start second and a random suffix so runs
/// started in the same second stay distinct.
pub fn new_run_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("run_{}_{}", now.format("%Y%m%d_%H%M%S"), &suffix[..6])
}
