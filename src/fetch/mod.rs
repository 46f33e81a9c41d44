//! Strategy-plural page fetching
//!
//! Two strategies return raw HTML for a URL: a remote rendering service for
//! JS-heavy sites ([`BrowserStrategy`]) and plain HTTP ([`HttpStrategy`]).
//! [`FetchEngine`] drives retries and the browser-then-http fallback for
//! `auto` mode. Strategies own their connections and release them on every
//! exit path; nothing browser-shaped is shared between jobs.

mod browser;
mod http;

pub use browser::BrowserStrategy;
pub use http::HttpStrategy;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::{ScrapingConfig, ServicesConfig};
use crate::types::{FetchMode, ScrapeStrategy};

/// Errors that can occur during fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("rendering service error (status {status}): {message}")]
    Render { status: u16, message: String },
    #[error("invalid content type: {0}")]
    InvalidContentType(String),
    #[error("browser strategy is not configured")]
    BrowserUnavailable,
    #[error("all fetch attempts failed: {0}")]
    Exhausted(String),
    #[error("failed to parse URL: {0}")]
    InvalidUrl(String),
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Raw HTML body
    pub html: String,
}

/// A single fetch strategy. Implementations are swapped by construction;
/// tests plug in scripted doubles.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;

    /// The tag recorded on scrape results produced by this strategy.
    fn strategy(&self) -> ScrapeStrategy;
}

/// Fetch engine driving strategy selection, retries and backoff
pub struct FetchEngine {
    browser: Option<Arc<dyn PageFetcher>>,
    http: Arc<dyn PageFetcher>,
    /// Bare client for the pre-scrape reachability probe
    probe_client: reqwest::Client,
    /// Engines built from explicit strategies skip the probe; doubles do
    /// not answer HEAD.
    probe_enabled: bool,
    attempts: u32,
    backoff_base: Duration,
}

impl FetchEngine {
    /// Build the engine from configuration. The browser strategy is only
    /// present when a rendering service is configured.
    pub fn new(scraping: &ScrapingConfig, services: &ServicesConfig) -> Result<Self, FetchError> {
        let browser: Option<Arc<dyn PageFetcher>> = if services.render.is_configured() {
            Some(Arc::new(BrowserStrategy::new(&services.render, scraping)?))
        } else {
            None
        };
        let http: Arc<dyn PageFetcher> = Arc::new(HttpStrategy::new(scraping)?);

        let probe_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(&scraping.user_agent)
            .build()?;

        Ok(Self {
            browser,
            http,
            probe_client,
            probe_enabled: true,
            attempts: scraping.fetch_attempts.max(1),
            backoff_base: Duration::from_millis(scraping.retry_backoff_ms),
        })
    }

    /// Construct with explicit strategies. Used by tests and anywhere a
    /// non-HTTP double is needed.
    pub fn with_strategies(
        browser: Option<Arc<dyn PageFetcher>>,
        http: Arc<dyn PageFetcher>,
        attempts: u32,
    ) -> Self {
        Self {
            browser,
            http,
            probe_client: reqwest::Client::new(),
            probe_enabled: false,
            attempts: attempts.max(1),
            backoff_base: Duration::from_millis(10),
        }
    }

    pub fn has_browser(&self) -> bool {
        self.browser.is_some()
    }

    /// Fetch a URL with the requested mode. Returns the page and the
    /// strategy that produced it.
    pub async fn fetch(
        &self,
        url: &Url,
        mode: FetchMode,
    ) -> Result<(FetchedPage, ScrapeStrategy), FetchError> {
        match mode {
            FetchMode::Browser => {
                let browser = self.browser.as_ref().ok_or(FetchError::BrowserUnavailable)?;
                self.fetch_with_retries(browser.as_ref(), url).await
            }
            FetchMode::Http => self.fetch_with_retries(self.http.as_ref(), url).await,
            FetchMode::Auto => {
                if let Some(browser) = &self.browser {
                    match self.fetch_with_retries(browser.as_ref(), url).await {
                        Ok(result) => return Ok(result),
                        Err(e) => {
                            debug!("browser strategy failed for {}: {}, falling back to http", url, e);
                        }
                    }
                }
                self.fetch_with_retries(self.http.as_ref(), url).await
            }
        }
    }

    async fn fetch_with_retries(
        &self,
        fetcher: &dyn PageFetcher,
        url: &Url,
    ) -> Result<(FetchedPage, ScrapeStrategy), FetchError> {
        let mut last_error = String::new();
        for attempt in 1..=self.attempts {
            match fetcher.fetch(url).await {
                Ok(page) => return Ok((page, fetcher.strategy())),
                Err(e) => {
                    debug!(
                        "{} fetch attempt {}/{} for {} failed: {}",
                        fetcher.strategy(),
                        attempt,
                        self.attempts,
                        url,
                        e
                    );
                    last_error = e.to_string();
                    if attempt < self.attempts {
                        tokio::time::sleep(self.backoff_base * attempt).await;
                    }
                }
            }
        }
        Err(FetchError::Exhausted(last_error))
    }

    /// Cheap reachability probe before committing to a crawl: HEAD first,
    /// then a plain GET for servers that reject HEAD. DNS/connect failures
    /// and server errors mean unreachable.
    pub async fn probe(&self, url: &Url) -> Result<(), FetchError> {
        if !self.probe_enabled {
            return Ok(());
        }
        match self.probe_client.head(url.as_str()).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.as_u16() == 405 || status.as_u16() == 501 {
                    // Server refuses HEAD, try GET before giving up.
                } else if status.is_server_error() {
                    return Err(FetchError::Status(status.as_u16()));
                } else {
                    return Ok(());
                }
            }
            Err(e) => {
                warn!("HEAD probe for {} failed: {}", url, e);
                return Err(FetchError::Http(e));
            }
        }

        let resp = self.probe_client.get(url.as_str()).send().await?;
        if resp.status().is_server_error() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Strategy double that fails a scripted number of times before
    /// succeeding (or always fails when `fail_all` is set).
    struct ScriptedFetcher {
        strategy: ScrapeStrategy,
        failures_before_success: u32,
        fail_all: bool,
        calls: AtomicU32,
    }

    impl ScriptedFetcher {
        fn failing(strategy: ScrapeStrategy) -> Self {
            Self {
                strategy,
                failures_before_success: 0,
                fail_all: true,
                calls: AtomicU32::new(0),
            }
        }

        fn succeeding_after(strategy: ScrapeStrategy, failures: u32) -> Self {
            Self {
                strategy,
                failures_before_success: failures,
                fail_all: false,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_all || call < self.failures_before_success {
                return Err(FetchError::Status(503));
            }
            Ok(FetchedPage {
                final_url: url.clone(),
                status: 200,
                html: "<html><body><p>ok</p></body></html>".to_string(),
            })
        }

        fn strategy(&self) -> ScrapeStrategy {
            self.strategy
        }
    }

    #[tokio::test]
    async fn test_auto_falls_back_to_http() {
        let engine = FetchEngine::with_strategies(
            Some(Arc::new(ScriptedFetcher::failing(ScrapeStrategy::Browser))),
            Arc::new(ScriptedFetcher::succeeding_after(ScrapeStrategy::Http, 0)),
            2,
        );
        let url = Url::parse("https://example.com").unwrap();
        let (_, strategy) = engine.fetch(&url, FetchMode::Auto).await.unwrap();
        assert_eq!(strategy, ScrapeStrategy::Http);
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let engine = FetchEngine::with_strategies(
            None,
            Arc::new(ScriptedFetcher::succeeding_after(ScrapeStrategy::Http, 1)),
            3,
        );
        let url = Url::parse("https://example.com").unwrap();
        let (page, strategy) = engine.fetch(&url, FetchMode::Http).await.unwrap();
        assert_eq!(strategy, ScrapeStrategy::Http);
        assert_eq!(page.status, 200);
    }

    #[tokio::test]
    async fn test_browser_mode_without_browser_fails() {
        let engine = FetchEngine::with_strategies(
            None,
            Arc::new(ScriptedFetcher::succeeding_after(ScrapeStrategy::Http, 0)),
            1,
        );
        let url = Url::parse("https://example.com").unwrap();
        let err = engine.fetch(&url, FetchMode::Browser).await.unwrap_err();
        assert!(matches!(err, FetchError::BrowserUnavailable));
    }

    #[tokio::test]
    async fn test_all_attempts_exhausted() {
        let engine = FetchEngine::with_strategies(
            None,
            Arc::new(ScriptedFetcher::failing(ScrapeStrategy::Http)),
            2,
        );
        let url = Url::parse("https://example.com").unwrap();
        let err = engine.fetch(&url, FetchMode::Http).await.unwrap_err();
        assert!(matches!(err, FetchError::Exhausted(_)));
    }
}
