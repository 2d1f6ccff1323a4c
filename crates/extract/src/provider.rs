use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use tabula_core::ProviderConfig;

use crate::prompts;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider call failed: {0}")]
    CallFailed(String),
    #[error("provider response invalid: {0}")]
    ResponseInvalid(String),
}

/// An external extraction service: a name, an ordered list of model variants,
/// and one call that returns the raw content string of a completion.
///
/// Implementations must not retry internally — the orchestrator owns the
/// fallback policy.
pub trait ExtractionProvider: Send + Sync {
    fn name(&self) -> &str;

    fn models(&self) -> &[String];

    fn extract(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

// ── Chat-completions HTTP client ──────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Production provider speaking the chat-completions wire format. Both
/// configured providers use this client; they differ only in base URL, key
/// and model list.
pub struct ChatCompletionsProvider {
    name: String,
    base_url: String,
    api_key: String,
    models: Vec<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl ChatCompletionsProvider {
    /// `None` when the provider has no API key — it is skipped entirely.
    pub fn from_config(config: &ProviderConfig, timeout_secs: u64) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            models: config.models.clone(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl ExtractionProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    async fn extract(&self, model: &str, system: &str, user: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "statement_extraction",
                    "schema": prompts::response_schema(),
                },
            },
        });

        debug!(provider = %self.name, model, "calling extraction provider");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::CallFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let head: String = text.chars().take(200).collect();
            return Err(ProviderError::CallFailed(format!("HTTP {status}: {head}")));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ResponseInvalid(format!("not a completion payload: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::ResponseInvalid("completion carries no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_config(key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            name: "primary".into(),
            base_url: "https://example.test/v1/".into(),
            api_key: key.map(str::to_string),
            models: vec!["model-a".into(), "model-b".into()],
        }
    }

    #[test]
    fn keyless_config_yields_no_provider() {
        assert!(ChatCompletionsProvider::from_config(&provider_config(None), 30).is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let p = ChatCompletionsProvider::from_config(&provider_config(Some("sk-test")), 30).unwrap();
        assert_eq!(p.base_url, "https://example.test/v1");
        assert_eq!(p.models(), ["model-a".to_string(), "model-b".to_string()]);
        assert_eq!(p.name(), "primary");
    }

    #[test]
    fn completion_payload_deserializes() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"transactions\":[]}"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{\"transactions\":[]}"));
    }

    #[test]
    fn completion_without_content_deserializes_to_none() {
        let raw = r#"{"choices":[{"message":{"role":"assistant"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
