//! JavaScript-capable fetch via a remote rendering service
//!
//! The service (browserless-style) owns the headless browser; this client
//! only speaks HTTP to its `/content` endpoint, so the browser process is
//! acquired and released per request and never shared between jobs.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use url::Url;

use crate::config::{RenderServiceConfig, ScrapingConfig};
use crate::types::ScrapeStrategy;

use super::{FetchError, FetchedPage, PageFetcher};

pub struct BrowserStrategy {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    navigation_timeout_ms: u64,
    body_wait_ms: u64,
    user_agent: String,
}

impl BrowserStrategy {
    pub fn new(render: &RenderServiceConfig, scraping: &ScrapingConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            // The render round-trip includes navigation plus the body wait.
            .timeout(Duration::from_secs(scraping.request_timeout_secs + 15))
            .build()?;
        Ok(Self {
            client,
            base_url: render.base_url.trim_end_matches('/').to_string(),
            token: render.token.clone(),
            navigation_timeout_ms: scraping.request_timeout_secs * 1000,
            body_wait_ms: scraping.body_wait_ms,
            user_agent: scraping.user_agent.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserStrategy {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(token) = &self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        // Images, fonts and stylesheets are dead weight for text extraction.
        let body = json!({
            "url": url.as_str(),
            "userAgent": self.user_agent,
            "rejectResourceTypes": ["image", "font", "stylesheet", "media"],
            "gotoOptions": {
                "timeout": self.navigation_timeout_ms,
                "waitUntil": "domcontentloaded",
            },
            "waitForSelector": {
                "selector": "body",
                "timeout": self.body_wait_ms,
            },
        });

        let response = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Render {
                status: status.as_u16(),
                message,
            });
        }

        let html = response.text().await?;
        Ok(FetchedPage {
            final_url: url.clone(),
            status: status.as_u16(),
            html,
        })
    }

    fn strategy(&self) -> ScrapeStrategy {
        ScrapeStrategy::Browser
    }
}
