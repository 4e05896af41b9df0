//! Step execution error types.

use thiserror::Error;

/// Errors that can occur while running a step's code.
#[derive(Debug, Error)]
pub enum StepError {
    /// The code ran but produced neither a return value nor the result variable.
    #[error("Code executed but '{0}' was not created")]
    MissingResult(String),

    /// The code failed to parse, raised at runtime, or hit a sandbox limit.
    #[error("Code execution failed: {0}")]
    CodeExecution(String),
}

impl From<Box<rhai::EvalAltResult>> for StepError {
    fn from(e: Box<rhai::EvalAltResult>) -> Self {
        match *e {
            // The progress callback supplies the reason.
            rhai::EvalAltResult::ErrorTerminated(reason, _) => {
                StepError::CodeExecution(reason.to_string())
            }
            other => StepError::CodeExecution(other.to_string()),
        }
    }
}

impl From<rhai::ParseError> for StepError {
    fn from(e: rhai::ParseError) -> Self {
        StepError::CodeExecution(e.to_string())
    }
}
