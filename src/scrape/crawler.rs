//! Same-origin site crawler
//!
//! Crawls up to `max_pages` pages starting from a seed URL. New links are
//! harvested from the first successful page only; everything stays on the
//! start URL's hostname. No fallback content is ever fabricated: when zero
//! pages succeed the whole scrape fails.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::fetch::FetchEngine;
use crate::types::{FetchMode, ScrapeResult, ScrapeStrategy};

use super::extractor::{extract_links, PageExtractor};

/// Errors that can occur during a crawl
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("All scraping strategies failed")]
    AllStrategiesFailed,
    #[error("crawl cancelled")]
    Cancelled,
}

/// Canonical form of a URL for visited/frontier bookkeeping: fragment
/// removed, trailing slash trimmed.
pub fn canonicalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.as_str().trim_end_matches('/').to_string()
}

/// Crawler for one site
pub struct SiteCrawler<'a> {
    engine: &'a FetchEngine,
    extractor: PageExtractor,
}

impl<'a> SiteCrawler<'a> {
    pub fn new(engine: &'a FetchEngine) -> Self {
        Self {
            engine,
            extractor: PageExtractor::new(),
        }
    }

    /// Crawl the site and return the extracted pages in visit order.
    ///
    /// The cancel flag is checked between pages; a cancelled crawl returns
    /// [`ScrapeError::Cancelled`] and discards partial results.
    pub async fn crawl(
        &self,
        start_url: &Url,
        mode: FetchMode,
        max_pages: usize,
        follow_links: bool,
        cancel: &AtomicBool,
    ) -> Result<ScrapeResult, ScrapeError> {
        let max_pages = max_pages.max(1);
        let start_host = start_url.host_str().unwrap_or_default().to_string();

        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier_keys: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<Url> = VecDeque::new();

        let start_key = canonicalize_url(start_url);
        frontier_keys.insert(start_key);
        frontier.push_back(start_url.clone());

        let mut pages = Vec::new();
        let mut strategy: Option<ScrapeStrategy> = None;

        while visited.len() < max_pages {
            if cancel.load(Ordering::Relaxed) {
                return Err(ScrapeError::Cancelled);
            }

            let Some(url) = frontier.pop_front() else {
                break;
            };
            let key = canonicalize_url(&url);
            if visited.contains(&key) {
                continue;
            }
            visited.insert(key);

            let (fetched, used_strategy) = match self.engine.fetch(&url, mode).await {
                Ok(result) => result,
                Err(e) => {
                    debug!("skipping {}: {}", url, e);
                    continue;
                }
            };

            let content = self.extractor.extract(&fetched.html, &fetched.final_url);
            if content.word_count == 0 {
                debug!("skipping {}: no extractable content", url);
                continue;
            }

            if pages.is_empty() {
                strategy = Some(used_strategy);
                if follow_links {
                    // Hrefs resolve against the URL as popped from the
                    // frontier, not the post-redirect URL.
                    let discovered = extract_links(&fetched.html, &url);
                    let mut added = 0usize;
                    for link in discovered {
                        if added >= max_pages.saturating_sub(1) {
                            break;
                        }
                        if link.host_str().unwrap_or_default() != start_host {
                            continue;
                        }
                        let link_key = canonicalize_url(&link);
                        if visited.contains(&link_key) || !frontier_keys.insert(link_key) {
                            continue;
                        }
                        frontier.push_back(link);
                        added += 1;
                    }
                    debug!("queued {} same-origin links from first page", added);
                }
            }

            pages.push(content);
        }

        let Some(strategy) = strategy else {
            return Err(ScrapeError::AllStrategiesFailed);
        };

        let total_words = pages.iter().map(|p| p.word_count).sum();
        Ok(ScrapeResult {
            pages,
            total_words,
            strategy,
            fetched_at: Utc::now(),
        })
    }
}
