//! Result extension trait for logging errors with context.
//!
//! Adds `log` and `log_skip` to `Result` so failures are recorded with
//! the caller's source location before being propagated or dropped.

use std::fmt::Display;
use tracing::{error, warn};

/// Extension trait for logging errors with context.
pub trait ResultExt<T, E> {
    /// Log the error with context if this is an `Err` variant.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use autoflow_control_plane::result_ext::ResultExt;
    ///
    /// let run = coordinator.run(&workflow_id).await.log("scheduled run")?;
    /// ```
    fn log<S: ToString>(self, context: S) -> Result<T, E>;

    /// Log a non-fatal error at warn level and discard it.
    ///
    /// Used where a failure only removes one item from a larger result,
    /// such as an unreadable table while building a dataset context.
    fn log_skip<S: ToString>(self, context: S) -> Option<T>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn log<S: ToString>(self, context: S) -> Result<T, E> {
        if let Err(ref e) = self {
            let caller_location = std::panic::Location::caller();
            error!(
                target: "autoflow_control_plane",
                error = %e,
                file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                context = %context.to_string(),
                "Operation failed"
            );
        }
        self
    }

    #[track_caller]
    fn log_skip<S: ToString>(self, context: S) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                let caller_location = std::panic::Location::caller();
                warn!(
                    target: "autoflow_control_plane",
                    error = %e,
                    file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                    context = %context.to_string(),
                    "Skipped after error"
                );
                None
            }
        }
    }
}
