//! Workflow definition model.
//!
//! A workflow is an ordered list of steps, each holding generated code.
//! Definitions are immutable once saved.

use autoflow_tools::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;

/// One unit of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Step identifier, unique within the workflow
    pub id: String,

    /// Names the step's materialized table; unique within the workflow
    pub numeric_id: i64,

    /// Declared upstream steps. Informational only
    #[serde(default)]
    pub input_ids: Vec<String>,

    /// Instruction the code was generated from
    #[serde(default)]
    pub prompt: Option<String>,

    /// Executable step code
    pub code: String,

    /// Inline sample records shown by the editor
    #[serde(default)]
    pub data: Vec<Record>,
}

/// Saved workflow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowDefinition {
    /// 8-character id taken from a v4 UUID
    pub id: String,

    pub name: String,

    /// Steps in execution order
    #[sqlx(json)]
    pub steps: Vec<Step>,

    /// Creation timestamp
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Build a new definition with a fresh id.
    pub fn new(name: String, steps: Vec<Step>) -> Self {
        let mut id = uuid::Uuid::new_v4().to_string();
        id.truncate(8);
        Self {
            id,
            name,
            steps,
            created_at: Utc::now(),
        }
    }
}

/// Check step identity rules: step ids and numeric ids are unique.
pub fn validate_steps(steps: &[Step]) -> Result<(), String> {
    let mut ids = HashSet::new();
    let mut numeric_ids = HashSet::new();
    for step in steps {
        if step.id.is_empty() {
            return Err("Step id must not be empty".to_string());
        }
        if !ids.insert(step.id.as_str()) {
            return Err(format!("Duplicate step id: {}", step.id));
        }
        if !numeric_ids.insert(step.numeric_id) {
            return Err(format!("Duplicate step numericId: {}", step.numeric_id));
        }
    }
    Ok(())
}

/// Request to save a workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSaveRequest {
    pub name: String,
    pub steps: Vec<Step>,
}

/// Response after saving a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSaveResponse {
    pub message: String,
    pub id: String,
}
