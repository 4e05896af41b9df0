//! HTTP handlers for the AutoFlow control plane API.
//!
//! This module contains all route handlers organized by domain.

pub mod health;
pub mod schedules;
pub mod tables;
pub mod transform;
pub mod workflows;

pub use health::{api_health, health_check};
