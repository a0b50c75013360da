use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Main configuration for GradeFlow.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GradeFlowConfig {
    /// Model gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Static code analysis configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Model gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Provider: "openai" or "anthropic"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier
    /// For OpenAI: model name (e.g., "gpt-4o-mini")
    /// For Anthropic: model name (e.g., "claude-3-5-sonnet-20241022")
    #[serde(default)]
    pub model: Option<String>,

    /// OpenAI API key
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Anthropic API key
    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum retries inside the gateway for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            openai_api_key: None,
            anthropic_api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Static code analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Submission language: "python" or "rust"
    #[serde(default = "default_language")]
    pub language: String,

    /// Enable the external lint sub-analyzer
    #[serde(default = "default_lint_enabled")]
    pub lint: bool,

    /// Override the linter executable probed on PATH
    #[serde(default)]
    pub linter: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            lint: default_lint_enabled(),
            linter: None,
        }
    }
}

impl GradeFlowConfig {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let mut config: GradeFlowConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.apply_env_overrides();
        info!(path = %path.display(), "Loaded GradeFlow configuration");
        Ok(config)
    }

    /// Default configuration plus environment overrides. This is the path
    /// used when no config file is present.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.gateway.openai_api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if !key.is_empty() {
                self.gateway.anthropic_api_key = Some(key);
            }
        }
        if let Ok(provider) = std::env::var("GRADEFLOW_PROVIDER") {
            if !provider.is_empty() {
                self.gateway.provider = provider;
            }
        }
        if let Ok(model) = std::env::var("GRADEFLOW_MODEL") {
            if !model.is_empty() {
                self.gateway.model = Some(model);
            }
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_language() -> String {
    "python".to_string()
}

fn default_lint_enabled() -> bool {
    true
}
