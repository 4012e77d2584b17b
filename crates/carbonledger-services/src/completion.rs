//! Anthropic (Claude) completion provider.
//!
//! Single-shot Messages API calls used by the emission analysis and
//! prediction endpoints. No retries, caching, or rate limiting; a failed or
//! malformed reply fails the whole request.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;

/// A provider of single-shot text completions. Implemented by the Anthropic
/// client in production and by canned doubles in tests.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one user prompt and return the model's text reply.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct AnthropicCompletion {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

// Messages API request/response
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessageParam>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockResponse {
    Text { text: String },
}

impl AnthropicCompletion {
    pub fn new(api_key: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            api_key,
            model,
            client,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", ANTHROPIC_API_BASE)
    }
}

#[async_trait]
impl CompletionProvider for AnthropicCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![MessageParam {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send Messages API request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Anthropic Messages API failed with status {}: {}",
                status,
                error_text
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Messages API response")?;

        let text = parsed
            .content
            .into_iter()
            .map(|b| match b {
                ContentBlockResponse::Text { text } => text,
            })
            .next()
            .unwrap_or_default();
        Ok(text)
    }
}
