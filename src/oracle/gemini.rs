//! Gemini client for the `generateContent` endpoint.
//!
//! Single non-streaming call per extraction; the entire transcript goes out in
//! one request and the reply comes back as concatenated candidate parts.

use async_trait::async_trait;

use super::{OracleError, TextOracle};
use crate::config::Config;

const GENERATE_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// HTTP client for the Gemini text-generation API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.oracle_api_key.clone(), config.oracle_model.clone())
    }

    /// Concatenate the text parts of the first candidate.
    fn extract_reply_text(body: &serde_json::Value) -> Option<String> {
        let parts = body["candidates"][0]["content"]["parts"].as_array()?;
        let text: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl TextOracle for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GENERATE_BASE, self.model, self.api_key
        );

        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let resp = self.http.post(&url).json(&payload).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
                .unwrap_or(body);
            log::warn!("oracle call failed with status {}: {}", status, message);
            return Err(OracleError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = resp.json().await?;
        Self::extract_reply_text(&body).ok_or(OracleError::EmptyReply)
    }
}
