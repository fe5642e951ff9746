use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How blank pages are put back once the content pages have been ordered.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReinsertionStrategy {
    /// Before the first placed page that was scanned after the blank page.
    #[default]
    PositionRelative,
    /// Back into the blank page's absolute scan slot.
    StableSort,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OrderingConfig {
    pub semantic_weight: f32,
    pub flow_weight: f32,
    /// Characters of each page handed to the flow scorer.
    pub flow_window_chars: usize,
    /// Characters of each page sent to the embedder.
    pub embedding_chars: usize,
    pub prompt_excerpt_chars: usize,
    pub prompt_excerpt_lines: usize,
    /// A greedy step below this transition score stops following the path.
    pub min_transition_score: f32,
    pub reinsertion: ReinsertionStrategy,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        OrderingConfig {
            semantic_weight: 0.6,
            flow_weight: 0.4,
            flow_window_chars: 500,
            embedding_chars: 2000,
            prompt_excerpt_chars: 400,
            prompt_excerpt_lines: 5,
            min_transition_score: 0.3,
            reinsertion: ReinsertionStrategy::PositionRelative,
        }
    }
}

impl OrderingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.semantic_weight < 0.0 || self.flow_weight < 0.0 {
            return Err(ConfigError::Invalid(
                "transition weights must be non-negative".to_string(),
            ));
        }
        if self.semantic_weight + self.flow_weight <= 0.0 {
            return Err(ConfigError::Invalid(
                "at least one transition weight must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_transition_score) {
            return Err(ConfigError::Invalid(format!(
                "min_transition_score must be within [0, 1], got {}",
                self.min_transition_score
            )));
        }
        if self.prompt_excerpt_chars == 0 || self.flow_window_chars == 0 {
            return Err(ConfigError::Invalid(
                "excerpt windows must be at least one character".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for an OpenAI-compatible chat-completions endpoint (Ollama by default).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OracleConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
    /// Name of the environment variable holding a bearer token, if the endpoint needs one.
    pub api_key_env: Option<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            enabled: true,
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3:latest".to_string(),
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: 120,
            api_key_env: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    #[default]
    Lexical,
    Http,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub api_key_env: Option<String>,
    /// Vector width of the offline lexical embedder.
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            provider: EmbeddingProvider::Lexical,
            base_url: "http://localhost:11434/v1".to_string(),
            model: "all-minilm".to_string(),
            timeout_secs: 60,
            api_key_env: None,
            dimension: 384,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub ordering: OrderingConfig,
    pub oracle: OracleConfig,
    pub embedding: EmbeddingConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ordering.validate()?;
        if self.embedding.provider == EmbeddingProvider::Lexical && self.embedding.dimension == 0 {
            return Err(ConfigError::Invalid(
                "lexical embedding dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads a bearer token from the named environment variable, if one was configured.
pub fn api_key_from_env(var: Option<&str>) -> Option<String> {
    var.and_then(|name| std::env::var(name).ok())
        .filter(|key| !key.trim().is_empty())
}
