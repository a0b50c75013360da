use crate::gateway::{GatewayError, GatewayResult, ModelGateway, RawCompletion, SYSTEM_PROMPT};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for the OpenAI gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key for OpenAI
    pub api_key: String,
    /// Base URL for API (default: https://api.openai.com/v1)
    pub base_url: String,
    /// Model to use (e.g., "gpt-4o-mini")
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries for failed requests
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: OPENAI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

/// OpenAI chat-completions gateway
pub struct OpenAiGateway {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiGateway {
    /// Create a new OpenAI gateway
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!(
                "OpenAI API key is required. Set OPENAI_API_KEY environment variable."
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
        Self::new(OpenAiConfig::default())
    }

    /// Send a request with retry logic. Auth failures are not retried.
    async fn send_request(
        &self,
        prompt: &str,
        max_tokens: usize,
    ) -> GatewayResult<ChatResponse> {
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
                            "OpenAI request failed (attempt {}/{}), retrying...",
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

    /// Try a single request to the chat completions endpoint
    async fn try_request(&self, prompt: &str, max_tokens: usize) -> GatewayResult<ChatResponse> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_completion_tokens: max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
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
            .json::<ChatResponse>()
            .await
            .map_err(|e| GatewayError::Transport(format!("failed to parse response: {e}")))
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn complete(&self, prompt: &str, max_tokens: usize) -> GatewayResult<RawCompletion> {
        let response = self.send_request(prompt, max_tokens).await?;

        let text = response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(RawCompletion {
            text,
            model: response.model,
            prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
        })
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Map an HTTP error status to the gateway failure taxonomy.
fn classify_status(status: reqwest::StatusCode, body: String) -> GatewayError {
    match status.as_u16() {
        401 | 403 => GatewayError::Auth(format!("OpenAI API error ({status}): {body}")),
        429 => GatewayError::RateLimited(format!("OpenAI API error ({status}): {body}")),
        _ => GatewayError::Transport(format!("OpenAI API error ({status}): {body}")),
    }
}

// OpenAI API request/response types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_completion_tokens: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_creation_requires_api_key() {
        let config = OpenAiConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(OpenAiGateway::new(config).is_err());
    }

    #[test]
    fn test_status_classification() {
        let status = reqwest::StatusCode::UNAUTHORIZED;
        assert!(matches!(
            classify_status(status, String::new()),
            GatewayError::Auth(_)
        ));

        let status = reqwest::StatusCode::TOO_MANY_REQUESTS;
        assert!(matches!(
            classify_status(status, String::new()),
            GatewayError::RateLimited(_)
        ));

        let status = reqwest::StatusCode::INTERNAL_SERVER_ERROR;
        assert!(matches!(
            classify_status(status, String::new()),
            GatewayError::Transport(_)
        ));
    }
}
