//! AutoFlow step runtime.
//!
//! This crate provides:
//! - In-memory tables and the run-scoped dataset context
//! - A sandboxed rhai executor for generated step code
//! - The `DataFrame` script type and the `pd` table library
//! - Cleanup of generated code text

pub mod context;
mod convert;
pub mod error;
pub mod executor;
pub mod frame;
pub mod sanitize;
pub mod table;

pub use context::{dataset_key, step_key, DatasetContext};
pub use error::StepError;
pub use executor::{ExecutorLimits, StepExecutor, StepOutput, RESULT_VARIABLE};
pub use sanitize::sanitize_code;
pub use table::{ColumnType, Record, Table};
