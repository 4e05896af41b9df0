//! Workflow execution engine.
//!
//! - **Context**: builds the dataset context from warehouse tables
//! - **Coordinator**: drives a run through its steps to a terminal state

pub mod context;
pub mod coordinator;

pub use context::build_dataset_context;
pub use coordinator::{RunCoordinator, RunOutcome};
