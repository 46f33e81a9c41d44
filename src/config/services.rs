//! Remote collaborator configuration
//!
//! Three external services back the pipeline: the keyword-metrics provider,
//! the AI provider, and an optional page-rendering service for JS-heavy
//! sites. Each is reached over HTTP and swapped for a double in tests.

use serde::{Deserialize, Serialize};

/// All remote collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServicesConfig {
    #[serde(default)]
    pub metrics: MetricsServiceConfig,
    #[serde(default)]
    pub ai: AiServiceConfig,
    #[serde(default)]
    pub render: RenderServiceConfig,
}

/// Keyword-metrics provider (search volume / competition / CPC)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsServiceConfig {
    /// Base URL of the provider service
    #[serde(default = "default_metrics_url")]
    pub base_url: String,
    /// Per-batch request timeout (seconds)
    #[serde(default = "default_metrics_timeout")]
    pub timeout_secs: u64,
    /// Seeds per provider request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_metrics_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_metrics_timeout() -> u64 {
    120
}

fn default_batch_size() -> usize {
    50
}

impl Default for MetricsServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_metrics_url(),
            timeout_secs: default_metrics_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

/// Generative-AI provider used for seed generation and cluster enhancement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiServiceConfig {
    /// API key; empty disables AI enhancement entirely
    #[serde(default)]
    pub api_key: String,
    /// Base URL of the messages API
    #[serde(default = "default_ai_url")]
    pub base_url: String,
    /// Model identifier passed through to the provider
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// Request timeout (seconds)
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
    /// Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_ai_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_ai_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_ai_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for AiServiceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_ai_url(),
            model: default_ai_model(),
            timeout_secs: default_ai_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl AiServiceConfig {
    /// AI enhancement is only available with a key configured.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Remote rendering service (browserless-style) for the browser strategy
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenderServiceConfig {
    /// Base URL of the rendering service; empty disables the browser strategy
    #[serde(default)]
    pub base_url: String,
    /// Optional access token appended to requests
    #[serde(default)]
    pub token: Option<String>,
}

impl RenderServiceConfig {
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }
}
