//! Database models for the AutoFlow control plane.
//!
//! This module contains SQLx-compatible model definitions
//! for the metadata tables.

pub mod run;
pub mod schedule;
pub mod table;
pub mod transform;
pub mod workflow;

pub use run::*;
pub use schedule::*;
pub use table::*;
pub use transform::*;
pub use workflow::*;

use serde::{Deserialize, Serialize};

/// Plain acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
