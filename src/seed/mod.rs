//! Seed keyword generation
//!
//! The primary path asks the AI provider for marketing-focused seed
//! keywords in the target language. When AI is disabled or fails, a
//! deterministic fallback mines the scraped content: frequency + TF-IDF
//! scored single tokens and short phrases from titles, descriptions and
//! headings.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::ai::AiEnhancer;
use crate::text::{is_stop_word, tokenize, TfIdf};
use crate::types::ScrapeResult;

/// Pages considered by the fallback miner.
const FALLBACK_PAGE_LIMIT: usize = 5;

/// Headings taken per page in the fallback miner.
const FALLBACK_HEADINGS_PER_PAGE: usize = 15;

/// Candidates must occur at least this often.
const MIN_CANDIDATE_FREQ: usize = 2;

/// Generic navigation words that never make useful seeds.
const NAV_WORDS: &[&str] = &["click", "page", "here", "more", "learn", "read", "view", "see"];

/// Outcome of seed generation.
#[derive(Debug)]
pub struct SeedOutcome {
    pub seeds: Vec<String>,
    pub used_ai: bool,
    /// Set when the AI path was attempted and failed.
    pub warning: Option<String>,
}

/// Seed keyword generator
pub struct SeedGenerator {
    ai: Option<Arc<AiEnhancer>>,
    max_seeds: usize,
}

impl SeedGenerator {
    pub fn new(ai: Option<Arc<AiEnhancer>>, max_seeds: usize) -> Self {
        Self { ai, max_seeds }
    }

    /// Generate seed keywords from scraped content.
    pub async fn generate(&self, scrape: &ScrapeResult, language: &str) -> SeedOutcome {
        let mut warning = None;

        if let Some(ai) = &self.ai {
            match ai.generate_seed_keywords(scrape, language, self.max_seeds).await {
                Ok(seeds) if !seeds.is_empty() => {
                    let seeds = dedup_normalized(seeds, self.max_seeds);
                    debug!("AI produced {} seed keywords", seeds.len());
                    return SeedOutcome {
                        seeds,
                        used_ai: true,
                        warning: None,
                    };
                }
                Ok(_) => {
                    warn!("AI returned no seed keywords, using fallback");
                    warning = Some("AI seed generation returned no keywords".to_string());
                }
                Err(e) => {
                    warn!("AI seed generation failed: {}, using fallback", e);
                    warning = Some(format!("AI seed generation failed: {}", e));
                }
            }
        }

        let seeds = self.fallback_seeds(scrape);
        debug!("fallback produced {} seed keywords", seeds.len());
        SeedOutcome {
            seeds,
            used_ai: false,
            warning,
        }
    }

    /// Deterministic seed mining over the first pages' titles, descriptions
    /// and headings.
    pub fn fallback_seeds(&self, scrape: &ScrapeResult) -> Vec<String> {
        // One document per page so TF-IDF can tell page-specific terms from
        // site-wide ones.
        let docs: Vec<String> = scrape
            .pages
            .iter()
            .take(FALLBACK_PAGE_LIMIT)
            .map(|page| {
                let mut parts: Vec<&str> = vec![&page.title, &page.meta_description];
                parts.extend(
                    page.all_headings()
                        .take(FALLBACK_HEADINGS_PER_PAGE)
                        .map(|h| h.as_str()),
                );
                parts.join(" ")
            })
            .collect();

        let token_docs: Vec<Vec<String>> = docs.iter().map(|d| tokenize(d)).collect();
        let tfidf = TfIdf::from_tokens(token_docs.clone());

        // Highest TF-IDF any token reaches in any document.
        let mut max_tfidf: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
        for doc_index in 0..token_docs.len() {
            for (term, score) in tfidf.list_terms(doc_index) {
                let entry = max_tfidf.entry(term).or_insert(0.0);
                if score > *entry {
                    *entry = score;
                }
            }
        }

        // Candidate singles and 2-3 word phrases with their frequencies.
        let mut freq: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for tokens in &token_docs {
            for token in tokens {
                if is_candidate_token(token) {
                    *freq.entry(token.clone()).or_insert(0) += 1;
                }
            }
            for size in [2usize, 3] {
                for window in tokens.windows(size) {
                    if phrase_content_ratio(window) >= 0.5 {
                        *freq.entry(window.join(" ")).or_insert(0) += 1;
                    }
                }
            }
        }

        let mut scored: Vec<(String, f64)> = freq
            .into_iter()
            .filter(|(candidate, count)| {
                *count >= MIN_CANDIDATE_FREQ && !NAV_WORDS.contains(&candidate.as_str())
            })
            .map(|(candidate, count)| {
                let best_tfidf = candidate
                    .split_whitespace()
                    .map(|t| max_tfidf.get(t).copied().unwrap_or(0.0))
                    .fold(0.0f64, f64::max);
                let length_bonus = if candidate.contains(' ') { 1.2 } else { 1.0 };
                let score = 0.3 * ((count as f64 + 1.0).ln() / 10.0) + 0.5 * best_tfidf + length_bonus;
                (candidate, score)
            })
            .collect();

        // Ties break alphabetically so the fallback stays deterministic.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(self.max_seeds);
        scored.into_iter().map(|(candidate, _)| candidate).collect()
    }
}

/// Single tokens must look like content words: long enough, vowel-bearing,
/// not a stop word, not a number.
fn is_candidate_token(token: &str) -> bool {
    token.chars().count() >= 3
        && token.chars().any(|c| "aeiouy".contains(c))
        && !token.chars().all(|c| c.is_ascii_digit())
        && !is_stop_word(token)
}

/// Fraction of phrase tokens that are content words.
fn phrase_content_ratio(tokens: &[String]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let content = tokens.iter().filter(|t| is_candidate_token(t)).count();
    content as f64 / tokens.len() as f64
}

fn dedup_normalized(seeds: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for seed in seeds {
        let normalized = seed.trim().to_lowercase();
        if normalized.is_empty() {
            continue;
        }
        if seen.insert(normalized.clone()) {
            out.push(normalized);
            if out.len() >= cap {
                break;
            }
        }
    }
    out
}
