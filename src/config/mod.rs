//! Configuration for keyscout

mod clustering;
mod logging;
mod scraping;
mod server;
mod services;

pub use clustering::ClusteringConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use scraping::ScrapingConfig;
pub use server::ServerConfig;
pub use services::{AiServiceConfig, MetricsServiceConfig, RenderServiceConfig, ServicesConfig};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for all page fetches: a recent desktop Chrome, since
/// many sites serve degraded markup to unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Main configuration for the keyscout service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP API server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Crawling configuration
    #[serde(default)]
    pub scraping: ScrapingConfig,
    /// Clustering configuration
    #[serde(default)]
    pub clustering: ClusteringConfig,
    /// Remote collaborator configuration
    #[serde(default)]
    pub services: ServicesConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file, then apply environment
    /// overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `KEYSCOUT_*` environment variable overrides for the knobs
    /// operators most commonly tune.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<usize>("KEYSCOUT_MAX_PAGES") {
            self.scraping.max_pages = v;
        }
        if let Some(v) = env_parse::<u64>("KEYSCOUT_SCRAPER_TIMEOUT_SECS") {
            self.scraping.request_timeout_secs = v;
        }
        if let Some(v) = env_parse::<usize>("KEYSCOUT_MAX_KEYWORDS") {
            self.clustering.max_keywords = v;
        }
        if let Some(v) = env_parse::<u64>("KEYSCOUT_MIN_SEARCH_VOLUME") {
            self.clustering.min_search_volume = v;
        }
        if let Ok(v) = std::env::var("KEYSCOUT_METRICS_URL") {
            if !v.is_empty() {
                self.services.metrics.base_url = v;
            }
        }
        if let Ok(v) = std::env::var("KEYSCOUT_AI_API_KEY") {
            if !v.is_empty() {
                self.services.ai.api_key = v;
            }
        }
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.scraping.max_pages == 0 {
            errors.push("scraping.max_pages must be positive".to_string());
        }
        if self.scraping.max_pages > 100 {
            errors.push("scraping.max_pages must be <= 100".to_string());
        }
        if self.scraping.request_timeout_secs == 0 {
            errors.push("scraping.request_timeout_secs must be positive".to_string());
        }
        if self.scraping.fetch_attempts == 0 {
            errors.push("scraping.fetch_attempts must be positive".to_string());
        }

        if self.clustering.min_cluster_size == 0 {
            errors.push("clustering.min_cluster_size must be >= 1".to_string());
        }
        if self.clustering.min_clusters > self.clustering.max_clusters {
            errors.push("clustering.min_clusters must be <= clustering.max_clusters".to_string());
        }
        if self.clustering.max_keywords == 0 {
            errors.push("clustering.max_keywords must be positive".to_string());
        }

        if self.server.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "server.listen_addr '{}' is not a valid socket address",
                self.server.listen_addr
            ));
        }
        if self.server.rate_limit_per_hour == 0 {
            errors.push("server.rate_limit_per_hour must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("Invalid configuration:\n  - {}", errors.join("\n  - "))
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
