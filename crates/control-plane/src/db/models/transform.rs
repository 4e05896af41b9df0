//! Ad-hoc transformation request and response models.

use autoflow_tools::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::codegen::TaskType;

/// Generate code from a prompt, then run it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessMultiRequest {
    /// Named record sets, exposed to the code under their names
    pub datasets: HashMap<String, Vec<Record>>,

    pub prompt: String,

    #[serde(default)]
    pub task_type: TaskType,
}

/// Run supplied code.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteMultiRequest {
    pub datasets: HashMap<String, Vec<Record>>,
    pub code: String,
}

/// Result rows and the code that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformResponse {
    pub result: Vec<Record>,
    pub code: String,
}
