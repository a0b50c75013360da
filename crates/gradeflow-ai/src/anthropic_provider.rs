use crate::gateway::{GatewayError, GatewayResult, ModelGateway, RawCompletion, SYSTEM_PROMPT};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic Claude gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key for Anthropic
    pub api_key: String,
    /// Model to use (e.g., "claude-3-5-sonnet-20241022")
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for failed requests
    pub max_retries: u32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

/// Anthropic Claude gateway
pub struct AnthropicGateway {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicGateway {
    /// Create a new Anthropic gateway
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!(
                "Anthropic API key is required. Set ANTHROPIC_API_KEY environment variable."
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(AnthropicConfig::default())
    }

    /// Send a request with retry logic. Auth failures are not retried.
    async fn send_request(
        &self,
        prompt: &str,
        max_tokens: usize,
    ) -> GatewayResult<MessagesResponse> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }

            match self.try_request(prompt, max_tokens).await {
                Ok(response) => return Ok(response),
                Err(e @ GatewayError::Auth(_)) => return Err(e),
                Err(e) => {
                    if attempt < self.config.max_retries {
                        tracing::warn!(
                            "Anthropic request failed (attempt {}/{}), retrying...",
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| GatewayError::Transport("all retry attempts failed".to_string())))
    }

    /// Try a single request to the messages endpoint
    async fn try_request(
        &self,
        prompt: &str,
        max_tokens: usize,
    ) -> GatewayResult<MessagesResponse> {
        let request = MessagesRequest {
            model: self.config.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{ANTHROPIC_API_BASE}/messages"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, body));
        }

        response
            .json::<MessagesResponse>()
            .await
            .map_err(|e| GatewayError::Transport(format!("failed to parse response: {e}")))
    }
}

#[async_trait]
impl ModelGateway for AnthropicGateway {
    async fn complete(&self, prompt: &str, max_tokens: usize) -> GatewayResult<RawCompletion> {
        let response = self.send_request(prompt, max_tokens).await?;

        let text = response
            .content
            .iter()
            .filter_map(|block| {
                if block.content_type == "text" {
                    block.text.as_deref()
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(RawCompletion {
            text,
            model: response.model,
            prompt_tokens: Some(response.usage.input_tokens),
            completion_tokens: Some(response.usage.output_tokens),
        })
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Map an HTTP error status to the gateway failure taxonomy.
fn classify_status(status: reqwest::StatusCode, body: String) -> GatewayError {
    match status.as_u16() {
        401 | 403 => GatewayError::Auth(format!("Anthropic API error ({status}): {body}")),
        429 => GatewayError::RateLimited(format!("Anthropic API error ({status}): {body}")),
        _ => GatewayError::Transport(format!("Anthropic API error ({status}): {body}")),
    }
}

// Anthropic API request/response types

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    system: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: usize,
    output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_creation_requires_api_key() {
        let config = AnthropicConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(AnthropicGateway::new(config).is_err());
    }

    #[test]
    fn test_status_classification() {
        let status = reqwest::StatusCode::FORBIDDEN;
        assert!(matches!(
            classify_status(status, String::new()),
            GatewayError::Auth(_)
        ));

        let status = reqwest::StatusCode::TOO_MANY_REQUESTS;
        assert!(matches!(
            classify_status(status, String::new()),
            GatewayError::RateLimited(_)
        ));
    }
}
