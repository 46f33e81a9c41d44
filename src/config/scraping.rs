//! Crawling configuration

use serde::{Deserialize, Serialize};

use super::DEFAULT_USER_AGENT;

/// Web crawling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Default maximum pages to crawl per job (per-job options clamp to [1, 100])
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Request timeout for a single page fetch (seconds)
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Attempts per fetch strategy before giving up or falling back
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,
    /// Base delay for the between-attempt backoff (milliseconds); the actual
    /// delay is base * attempt number
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// User agent string for all page fetches
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Extra wait for the document body after DOM content loaded, when the
    /// rendering service is in play (milliseconds)
    #[serde(default = "default_body_wait_ms")]
    pub body_wait_ms: u64,
}

fn default_max_pages() -> usize {
    20
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_fetch_attempts() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_body_wait_ms() -> u64 {
    5000
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            request_timeout_secs: default_timeout_secs(),
            fetch_attempts: default_fetch_attempts(),
            retry_backoff_ms: default_backoff_ms(),
            user_agent: default_user_agent(),
            body_wait_ms: default_body_wait_ms(),
        }
    }
}
