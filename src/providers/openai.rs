//! OpenAI provider implementation for chatvault
//!
//! Implements [`ChatProvider`] against an OpenAI-compatible chat
//! completions endpoint. The base URL is configurable so any server
//! speaking the same wire format works unchanged.

use crate::config::ProviderConfig;
use crate::error::{ChatvaultError, Result};
use crate::providers::ChatProvider;
use crate::store::Turn;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI-compatible chat completions provider
///
/// # Examples
///
/// ```
/// use chatvault::config::ProviderConfig;
/// use chatvault::providers::OpenAiProvider;
///
/// let config = ProviderConfig {
///     model: "gpt-4o-mini".to_string(),
///     api_key: "sk-test".to_string(),
///     ..ProviderConfig::default()
/// };
/// let provider = OpenAiProvider::new(config);
/// assert!(provider.is_ok());
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

/// Request structure for the chat completions API
#[derive(Debug, Serialize)]
struct CompletionsRequest {
    model: String,
    messages: Vec<WireMessage>,
}

/// Message structure on the wire
#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
}

/// Response structure from the chat completions API
#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<CompletionsChoice>,
}

/// Single choice in a completions response
#[derive(Debug, Deserialize)]
struct CompletionsChoice {
    message: WireMessage,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider instance
    ///
    /// # Arguments
    ///
    /// * `config` - provider configuration with model, API key, and base URL
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("chatvault/0.1.0")
            .build()
            .map_err(|e| {
                ChatvaultError::Provider(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!(
            "Initialized OpenAI provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self { client, config })
    }

    /// Convert a prompt window to wire format
    fn to_wire_messages(window: &[Turn]) -> Vec<WireMessage> {
        window
            .iter()
            .map(|turn| WireMessage {
                role: turn.role.to_string(),
                content: turn.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn generate_reply(&self, window: &[Turn]) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let request = CompletionsRequest {
            model: self.config.model.clone(),
            messages: Self::to_wire_messages(window),
        };

        tracing::debug!(
            model = %self.config.model,
            window_len = window.len(),
            "Requesting chat completion"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ChatvaultError::Provider(format!("Chat completion request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatvaultError::Provider(format!(
                "Chat completion failed with status {}: {}",
                status, body
            ))
            .into());
        }

        let completion: CompletionsResponse = response.json().await.map_err(|e| {
            ChatvaultError::Provider(format!("Failed to parse completion response: {}", e))
        })?;

        let reply = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ChatvaultError::Provider("Completion response contained no choices".to_string())
            })?;

        Ok(reply)
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }
}
