//! HTTP API server configuration

use serde::{Deserialize, Serialize};

/// HTTP API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// API keys for authentication (empty = no auth required)
    #[serde(default)]
    pub api_keys: Vec<String>,
    /// Enable permissive CORS (useful for browser-based clients)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Maximum job creations per source IP per hour
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_hour: usize,
    /// Honor X-Forwarded-For when resolving the client IP. Only enable
    /// behind a proxy you control; otherwise the rate limit is spoofable.
    #[serde(default)]
    pub trust_proxy: bool,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_true() -> bool {
    true
}

fn default_rate_limit() -> usize {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            api_keys: Vec::new(),
            cors_enabled: true,
            rate_limit_per_hour: 10,
            trust_proxy: false,
        }
    }
}
