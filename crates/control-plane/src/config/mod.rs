//! Configuration module for the AutoFlow control plane.
//!
//! This module provides configuration loading from environment variables
//! using the `envy` crate for type-safe environment variable parsing.

mod app;
mod gemini;
mod store;

pub use app::AppConfig;
pub use gemini::GeminiConfig;
pub use store::StoreConfig;
