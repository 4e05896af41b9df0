//! Code provider configuration.

use serde::Deserialize;

/// Gemini configuration loaded from environment variables.
///
/// Environment variables are prefixed with `GEMINI_`:
/// - `GEMINI_API_KEY`: API key (generation is unavailable without it)
/// - `GEMINI_MODEL`: Model name (default: "gemini-3-pro-preview")
/// - `GEMINI_BASE_URL`: REST endpoint root
/// - `GEMINI_TIMEOUT_SECONDS`: Request timeout (default: 120)
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl GeminiConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `GEMINI_`.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("GEMINI_").from_env::<GeminiConfig>()
    }

    /// URL of the `generateContent` method for the configured model.
    pub fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}
