use crate::gateway::ModelGateway;
use gradeflow_core::{GatewayConfig, GradeFlowError, Result};
use std::sync::Arc;

#[cfg(feature = "anthropic")]
use crate::anthropic_provider::{AnthropicConfig, AnthropicGateway};

#[cfg(feature = "openai")]
use crate::openai_provider::{OpenAiConfig, OpenAiGateway};

/// Factory for creating model gateways based on configuration.
///
/// Missing or unusable credentials surface as
/// [`GradeFlowError::Configuration`] here, before any grading run starts.
/// This is the one hard failure the pipeline exposes to callers.
pub struct GatewayFactory;

impl GatewayFactory {
    /// Create a gateway from configuration.
    pub fn create_from_config(config: &GatewayConfig) -> Result<Arc<dyn ModelGateway>> {
        let provider = config.provider.to_lowercase();

        match provider.as_str() {
            #[cfg(feature = "openai")]
            "openai" => Self::create_openai_gateway(config),
            #[cfg(feature = "anthropic")]
            "anthropic" => Self::create_anthropic_gateway(config),
            _ => Err(GradeFlowError::Configuration(format!(
                "Unsupported model provider: {}. Available providers:{}{}",
                provider,
                if cfg!(feature = "openai") {
                    " openai"
                } else {
                    ""
                },
                if cfg!(feature = "anthropic") {
                    " anthropic"
                } else {
                    ""
                }
            ))),
        }
    }

    #[cfg(feature = "openai")]
    fn create_openai_gateway(config: &GatewayConfig) -> Result<Arc<dyn ModelGateway>> {
        let api_key = config
            .openai_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                GradeFlowError::Configuration(
                    "OpenAI API key not found. Set 'openai_api_key' in config \
                     or OPENAI_API_KEY environment variable"
                        .to_string(),
                )
            })?;

        let openai_config = OpenAiConfig {
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            ..Default::default()
        };

        let gateway = OpenAiGateway::new(openai_config)
            .map_err(|e| GradeFlowError::Configuration(e.to_string()))?;
        Ok(Arc::new(gateway))
    }

    #[cfg(feature = "anthropic")]
    fn create_anthropic_gateway(config: &GatewayConfig) -> Result<Arc<dyn ModelGateway>> {
        let api_key = config
            .anthropic_api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                GradeFlowError::Configuration(
                    "Anthropic API key not found. Set 'anthropic_api_key' in config \
                     or ANTHROPIC_API_KEY environment variable"
                        .to_string(),
                )
            })?;

        let anthropic_config = AnthropicConfig {
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "claude-3-5-sonnet-20241022".to_string()),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        };

        let gateway = AnthropicGateway::new(anthropic_config)
            .map_err(|e| GradeFlowError::Configuration(e.to_string()))?;
        Ok(Arc::new(gateway))
    }

    /// Providers this build supports.
    pub fn supported_providers() -> Vec<&'static str> {
        let mut providers = Vec::new();

        #[cfg(feature = "openai")]
        providers.push("openai");

        #[cfg(feature = "anthropic")]
        providers.push("anthropic");

        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_configuration_error() {
        let config = GatewayConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        let result = GatewayFactory::create_from_config(&config);
        assert!(matches!(result, Err(GradeFlowError::Configuration(_))));
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_openai_gateway_from_config_key() {
        let config = GatewayConfig {
            provider: "openai".to_string(),
            openai_api_key: Some("test-key".to_string()),
            model: Some("gpt-4o-mini".to_string()),
            ..Default::default()
        };
        let gateway = GatewayFactory::create_from_config(&config).unwrap();
        assert_eq!(gateway.provider_name(), "openai");
        assert_eq!(gateway.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_supported_providers_reflect_features() {
        let providers = GatewayFactory::supported_providers();
        #[cfg(feature = "openai")]
        assert!(providers.contains(&"openai"));
        #[cfg(not(any(feature = "openai", feature = "anthropic")))]
        assert!(providers.is_empty());
    }
}
