//! Gemini `generateContent` client.

use async_trait::async_trait;
use autoflow_tools::sanitize_code;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::CodeProvider;
use crate::config::GeminiConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

fn api_error(message: impl std::fmt::Display) -> AppError {
    AppError::CodeGeneration(format!("Gemini API Error: {}", message))
}

/// Code provider backed by the Gemini REST API.
#[derive(Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }
}

#[async_trait]
impl CodeProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| api_error("GEMINI_API_KEY is not set"))?;

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(self.config.generate_url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(api_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(format!("Status {}: {}", status, body)));
        }

        let parsed: GenerateResponse = response.json().await.map_err(api_error)?;
        let text = parsed
            .text()
            .ok_or_else(|| api_error("response contained no text"))?;

        tracing::debug!(model = %self.config.model, chars = text.len(), "Code generated");

        Ok(sanitize_code(&text))
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text() {
        let parsed: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "```rhai\n" }, { "text": "df_x\n```" }] }
            }]
        }))
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("```rhai\ndf_x\n```"));

        let empty: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.text().is_none());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let provider = GeminiProvider::new(GeminiConfig::default());
        assert!(!provider.is_configured());

        let err = provider.generate("prompt").await.unwrap_err();
        assert!(matches!(err, AppError::CodeGeneration(ref m) if m.starts_with("Gemini API Error")));
    }
}
