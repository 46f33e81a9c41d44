//! Keyword-metrics provider client
//!
//! Talks to the remote metrics service that wraps the ads platform's
//! keyword-ideas API. Seeds go out in batches; responses are normalized
//! into [`Keyword`] values (competition buckets, CPC micros divided out,
//! minimum-volume filter, total cap). The provider is behind a trait so
//! tests and the pipeline construct whatever implementation they need.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::MetricsServiceConfig;
use crate::types::{Competition, Keyword};

/// Errors from the metrics provider
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("provider returned an unparseable response")]
    BadResponse,
}

/// Source of keyword metrics. Implementations are swapped by construction.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Fetch metrics for the given seeds in one market/language.
    async fn keyword_metrics(
        &self,
        seeds: &[String],
        country: &str,
        language: &str,
    ) -> Result<Vec<Keyword>, MetricsError>;
}

#[derive(Debug, Serialize)]
struct IdeasRequest<'a> {
    keywords: &'a [String],
    country: &'a str,
    language: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdeasResponse {
    success: bool,
    #[serde(default)]
    keywords: Vec<IdeaEntry>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdeaEntry {
    keyword: String,
    #[serde(default)]
    search_volume: i64,
    #[serde(default)]
    competition: String,
    /// Low top-of-page bid in micros
    #[serde(default)]
    cpc: f64,
    /// High top-of-page bid in micros
    #[serde(default)]
    cpc_high: f64,
}

/// HTTP client for the keyword-metrics service
pub struct KeywordMetricsClient {
    client: reqwest::Client,
    base_url: String,
    batch_size: usize,
    min_search_volume: u64,
    max_keywords: usize,
}

impl KeywordMetricsClient {
    pub fn new(
        config: &MetricsServiceConfig,
        min_search_volume: u64,
        max_keywords: usize,
    ) -> Result<Self, MetricsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            batch_size: config.batch_size.max(1),
            min_search_volume,
            max_keywords,
        })
    }

    async fn fetch_batch(
        &self,
        batch: &[String],
        country: &str,
        language: &str,
    ) -> Result<Vec<IdeaEntry>, MetricsError> {
        let url = format!("{}/generate-keyword-ideas", self.base_url);
        let request = IdeasRequest {
            keywords: batch,
            country,
            language,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MetricsError::Provider(format!("status {}: {}", status, message)));
        }

        let body: IdeasResponse = response.json().await.map_err(|_| MetricsError::BadResponse)?;
        if !body.success {
            return Err(MetricsError::Provider(
                body.error.unwrap_or_else(|| "unknown provider error".to_string()),
            ));
        }
        Ok(body.keywords)
    }
}

#[async_trait]
impl MetricsProvider for KeywordMetricsClient {
    async fn keyword_metrics(
        &self,
        seeds: &[String],
        country: &str,
        language: &str,
    ) -> Result<Vec<Keyword>, MetricsError> {
        let mut entries = Vec::new();
        let batches = seeds.chunks(self.batch_size);
        let batch_count = (seeds.len() + self.batch_size - 1) / self.batch_size.max(1);

        for (index, batch) in batches.enumerate() {
            debug!(
                "fetching keyword metrics batch {}/{} ({} seeds)",
                index + 1,
                batch_count,
                batch.len()
            );
            let mut batch_entries = self.fetch_batch(batch, country, language).await?;
            entries.append(&mut batch_entries);
            if entries.len() >= self.max_keywords {
                debug!("reached max keywords cap ({})", self.max_keywords);
                break;
            }
        }

        let keywords = normalize_entries(entries, self.min_search_volume, self.max_keywords);
        debug!("metrics provider returned {} usable keywords", keywords.len());
        Ok(keywords)
    }
}

/// Normalize raw provider entries: drop low-volume keywords, convert CPC
/// micros to currency units, bucket competition, cap the total.
fn normalize_entries(entries: Vec<IdeaEntry>, min_volume: u64, cap: usize) -> Vec<Keyword> {
    let mut keywords = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for entry in entries {
        if keywords.len() >= cap {
            break;
        }
        let volume = entry.search_volume.max(0) as u64;
        if volume < min_volume {
            continue;
        }
        let text = entry.keyword.trim().to_lowercase();
        if text.is_empty() || !seen.insert(text.clone()) {
            continue;
        }

        let mut cpc_low = entry.cpc.max(0.0) / 1_000_000.0;
        let mut cpc_high = entry.cpc_high.max(0.0) / 1_000_000.0;
        if cpc_high < cpc_low {
            std::mem::swap(&mut cpc_low, &mut cpc_high);
        }

        keywords.push(
            Keyword::new(text, volume, Competition::parse(&entry.competition))
                .with_cpc(cpc_low, cpc_high),
        );
    }

    keywords
}
