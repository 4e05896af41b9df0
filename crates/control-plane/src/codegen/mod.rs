//! Step code generation.
//!
//! A prompt is rendered from the instruction and the schema of every
//! dataset, sent to a [`CodeProvider`], and the reply is stripped of
//! markdown fences.

pub mod gemini;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

pub use gemini::GeminiProvider;
pub use prompt::PromptBuilder;

/// Prompt flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskType {
    /// Free-form data manipulation
    #[default]
    General,
    /// Reconciliation of two datasets on shared keys
    Recon,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::General => "GENERAL",
            TaskType::Recon => "RECON",
        }
    }
}

/// Turns a rendered prompt into step code.
#[async_trait]
pub trait CodeProvider: Send + Sync {
    /// Generate code for `prompt`. The returned text is already sanitized.
    async fn generate(&self, prompt: &str) -> AppResult<String>;

    /// Whether the provider has what it needs to be called.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Provider returning fixed code, for tests.
#[cfg(test)]
pub(crate) struct StaticProvider(pub String);

#[cfg(test)]
#[async_trait]
impl CodeProvider for StaticProvider {
    async fn generate(&self, _prompt: &str) -> AppResult<String> {
        Ok(autoflow_tools::sanitize_code(&self.0))
    }
}
