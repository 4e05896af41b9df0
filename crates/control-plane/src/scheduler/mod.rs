//! Time-based workflow scheduling.
//!
//! - **Trigger**: interval and daily fire-time arithmetic
//! - **Service**: persisted entries and the background ticker

pub mod service;
pub mod trigger;

pub use service::SchedulerService;
pub use trigger::Trigger;
