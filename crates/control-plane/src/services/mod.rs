//! Service layer for the AutoFlow control plane.
//!
//! Services encapsulate business logic and coordinate
//! between handlers, the engine and database queries.

pub mod table;
pub mod transform;
pub mod workflow;

pub use table::TableService;
pub use transform::TransformService;
pub use workflow::WorkflowService;
