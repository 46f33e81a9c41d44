//! Plain HTTP fetch strategy

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::ScrapingConfig;
use crate::types::ScrapeStrategy;

use super::{FetchError, FetchedPage, PageFetcher};

/// Plain HTTP GET: follows up to 5 redirects, accepts gzip, desktop-Chrome
/// user agent. Status >= 400 is an error.
pub struct HttpStrategy {
    client: reqwest::Client,
}

impl HttpStrategy {
    pub fn new(config: &ScrapingConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpStrategy {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();
        if !content_type.contains("text/html")
            && !content_type.contains("application/xhtml")
            && !content_type.contains("text/plain")
        {
            return Err(FetchError::InvalidContentType(content_type));
        }

        let final_url = Url::parse(response.url().as_str())
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        let html = response.text().await?;

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            html,
        })
    }

    fn strategy(&self) -> ScrapeStrategy {
        ScrapeStrategy::Http
    }
}
