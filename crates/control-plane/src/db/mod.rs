//! Database module for the AutoFlow control plane.
//!
//! Two SQLite databases are used: the metadata store (workflows, run
//! records, schedules) and the warehouse holding user and materialized
//! tables.

pub mod models;
pub mod pool;
pub mod queries;
pub mod schema;

pub use pool::{create_pool, DbPool};
