//! Database queries for the AutoFlow control plane.
//!
//! This module contains database query functions organized by domain.

pub mod run;
pub mod schedule;
pub mod warehouse;
pub mod workflow;
