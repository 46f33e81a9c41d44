//! Core types for the keyword-research pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Competition bucket reported by the metrics provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Competition {
    Low,
    Medium,
    High,
    Unknown,
}

impl Competition {
    /// Parse a provider competition string, anything unrecognized maps to Unknown.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" => Competition::Low,
            "medium" => Competition::Medium,
            "high" => Competition::High,
            _ => Competition::Unknown,
        }
    }

    /// Numeric value used for averaging: low=1, medium=2, high=3.
    /// Unknown is treated as medium.
    pub fn as_value(&self) -> f64 {
        match self {
            Competition::Low => 1.0,
            Competition::Medium | Competition::Unknown => 2.0,
            Competition::High => 3.0,
        }
    }

    /// Feature-vector weight: low=1, medium=0.5, high=0.
    pub fn as_feature(&self) -> f64 {
        match self {
            Competition::Low => 1.0,
            Competition::Medium | Competition::Unknown => 0.5,
            Competition::High => 0.0,
        }
    }

    /// Bucket an averaged competition value: <1.5 low, <2.5 medium, else high.
    pub fn from_avg_value(avg: f64) -> Self {
        if avg < 1.5 {
            Competition::Low
        } else if avg < 2.5 {
            Competition::Medium
        } else {
            Competition::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Competition::Low => "low",
            Competition::Medium => "medium",
            Competition::High => "high",
            Competition::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Competition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyword with the metrics the provider returned for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    pub text: String,
    pub search_volume: u64,
    pub competition: Competition,
    /// Low top-of-page bid, in currency units (micros already divided out).
    pub cpc_low: f64,
    /// High top-of-page bid, always >= cpc_low.
    pub cpc_high: f64,
}

impl Keyword {
    pub fn new(text: impl Into<String>, search_volume: u64, competition: Competition) -> Self {
        Self {
            text: text.into(),
            search_volume,
            competition,
            cpc_low: 0.0,
            cpc_high: 0.0,
        }
    }

    pub fn with_cpc(mut self, low: f64, high: f64) -> Self {
        self.cpc_low = low.max(0.0);
        self.cpc_high = high.max(self.cpc_low);
        self
    }

    /// Canonical form used for equality and uniqueness: lowercase, trimmed.
    pub fn canonical(&self) -> String {
        self.text.trim().to_lowercase()
    }

    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Clustering algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterAlgorithm {
    KMeans,
    Dbscan,
    Semantic,
    #[default]
    Hybrid,
}

impl ClusterAlgorithm {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "kmeans" => Some(ClusterAlgorithm::KMeans),
            "dbscan" => Some(ClusterAlgorithm::Dbscan),
            "semantic" => Some(ClusterAlgorithm::Semantic),
            "hybrid" => Some(ClusterAlgorithm::Hybrid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterAlgorithm::KMeans => "kmeans",
            ClusterAlgorithm::Dbscan => "dbscan",
            ClusterAlgorithm::Semantic => "semantic",
            ClusterAlgorithm::Hybrid => "hybrid",
        }
    }
}

/// A ranked topic cluster.
///
/// The derived fields (total/avg volume, avg competition, value score) are
/// recomputed through [`Cluster::recompute_metrics`] whenever membership
/// changes; they are never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: u32,
    pub pillar_topic: String,
    /// Sorted by search volume, descending.
    pub keywords: Vec<Keyword>,
    pub total_search_volume: u64,
    pub avg_search_volume: f64,
    pub avg_competition: Competition,
    /// Overlap with the site context, in [0, 1].
    pub relevance_score: f64,
    /// Combined value score, in [0, 100].
    pub cluster_value_score: f64,
    pub algorithm: ClusterAlgorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_content_strategy: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ai_priority: bool,
    /// 1-based rank after sorting; 0 until ranked.
    pub rank: u32,
}

impl Cluster {
    pub fn new(id: u32, keywords: Vec<Keyword>, algorithm: ClusterAlgorithm) -> Self {
        let mut cluster = Self {
            id,
            pillar_topic: String::new(),
            keywords,
            total_search_volume: 0,
            avg_search_volume: 0.0,
            avg_competition: Competition::Unknown,
            relevance_score: 0.0,
            cluster_value_score: 0.0,
            algorithm,
            ai_description: None,
            ai_content_strategy: None,
            ai_priority: false,
            rank: 0,
        };
        cluster.recompute_metrics();
        cluster
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    /// Re-derive volume totals, averages and the competition bucket from the
    /// current membership, and restore the volume-descending sort order.
    pub fn recompute_metrics(&mut self) {
        self.keywords
            .sort_by(|a, b| b.search_volume.cmp(&a.search_volume));
        self.total_search_volume = self.keywords.iter().map(|k| k.search_volume).sum();
        let count = self.keywords.len();
        if count == 0 {
            self.avg_search_volume = 0.0;
            self.avg_competition = Competition::Unknown;
            return;
        }
        self.avg_search_volume = self.total_search_volume as f64 / count as f64;
        let avg_value =
            self.keywords.iter().map(|k| k.competition.as_value()).sum::<f64>() / count as f64;
        self.avg_competition = Competition::from_avg_value(avg_value);
    }

    /// Whether this cluster already contains a keyword with the same
    /// canonical text.
    pub fn contains_keyword(&self, canonical: &str) -> bool {
        self.keywords.iter().any(|k| k.canonical() == canonical)
    }
}

/// How pages are fetched during the crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Try the rendering service first, fall back to plain HTTP.
    #[default]
    Auto,
    Browser,
    Http,
}

impl FetchMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "auto" => Some(FetchMode::Auto),
            "browser" => Some(FetchMode::Browser),
            "http" => Some(FetchMode::Http),
            _ => None,
        }
    }
}

/// Which strategy produced a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStrategy {
    Browser,
    Http,
}

impl fmt::Display for ScrapeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeStrategy::Browser => f.write_str("browser"),
            ScrapeStrategy::Http => f.write_str("http"),
        }
    }
}

/// Structured content extracted from one crawled page. Read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
    /// Substantive paragraphs (>= 10 words each).
    pub paragraphs: Vec<String>,
    pub list_items: Vec<String>,
    /// Deduplicated anchor texts.
    pub links: Vec<String>,
    /// Non-empty image alt texts.
    pub image_alts: Vec<String>,
    pub word_count: usize,
}

impl PageContent {
    /// Headings across all levels, in level order.
    pub fn all_headings(&self) -> impl Iterator<Item = &String> {
        self.h1.iter().chain(self.h2.iter()).chain(self.h3.iter())
    }
}

/// Result of crawling a site: the pages in visit order plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub pages: Vec<PageContent>,
    pub total_words: usize,
    /// The strategy that produced the first page.
    pub strategy: ScrapeStrategy,
    pub fetched_at: DateTime<Utc>,
}

/// Site context fed into relevance filtering and AI prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteContext {
    pub url: String,
    pub title: String,
    pub description: String,
    pub page_titles: Vec<String>,
    pub meta_descriptions: Vec<String>,
    /// Prominent terms (H1/H2 texts) emphasizing what the site is about.
    pub focus_terms: Vec<String>,
}

impl SiteContext {
    /// Build the context from a scrape result.
    pub fn from_scrape(url: &str, scrape: &ScrapeResult) -> Self {
        let first = scrape.pages.first();
        Self {
            url: url.to_string(),
            title: first.map(|p| p.title.clone()).unwrap_or_default(),
            description: first.map(|p| p.meta_description.clone()).unwrap_or_default(),
            page_titles: scrape
                .pages
                .iter()
                .map(|p| p.title.clone())
                .filter(|t| !t.is_empty())
                .collect(),
            meta_descriptions: scrape
                .pages
                .iter()
                .map(|p| p.meta_description.clone())
                .filter(|d| !d.is_empty())
                .collect(),
            focus_terms: scrape
                .pages
                .iter()
                .flat_map(|p| p.h1.iter().chain(p.h2.iter()).cloned())
                .collect(),
        }
    }

    /// True when no field carries any text.
    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
            && self.title.is_empty()
            && self.description.is_empty()
            && self.page_titles.is_empty()
            && self.meta_descriptions.is_empty()
            && self.focus_terms.is_empty()
    }
}

/// Per-job options, clamped and defaulted at job creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchOptions {
    pub max_pages: usize,
    pub follow_links: bool,
    pub scrape_strategy: FetchMode,
    pub cluster_algorithm: ClusterAlgorithm,
    pub min_cluster_size: usize,
    pub use_ai: bool,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self {
            max_pages: 20,
            follow_links: true,
            scrape_strategy: FetchMode::Auto,
            cluster_algorithm: ClusterAlgorithm::Hybrid,
            min_cluster_size: 3,
            use_ai: true,
        }
    }
}

/// Job lifecycle status. Transitions are monotonic:
/// processing -> {completed | failed | cancelled}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// The final payload of a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchData {
    pub url: String,
    pub country: String,
    pub language: String,
    pub total_keywords: usize,
    pub total_clusters: usize,
    pub clusters: Vec<Cluster>,
    pub pages_scanned: usize,
    pub seed_count: usize,
    pub scrape_strategy: ScrapeStrategy,
    pub processing_time_ms: u64,
}

/// Fields kept on a job for the pipeline's own use, never serialized out.
#[derive(Debug, Clone, Default)]
pub struct JobInternal {
    pub source_ip: Option<String>,
    pub ai_requested: bool,
}

/// A research job as tracked by the store and served over the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub url: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_language: Option<String>,
    pub resolved_language: String,
    pub options: ResearchOptions,
    pub status: JobStatus,
    /// Percent complete, monotonically non-decreasing, in [0, 100].
    pub progress: u8,
    /// Short label for the current stage.
    pub step: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResearchData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(skip)]
    pub internal: JobInternal,
}

impl Job {
    pub fn new(
        url: String,
        country: String,
        requested_language: Option<String>,
        resolved_language: String,
        options: ResearchOptions,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            url,
            country,
            requested_language,
            resolved_language,
            options,
            status: JobStatus::Processing,
            progress: 0,
            step: "created".to_string(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            failed_at: None,
            error: None,
            warnings: Vec::new(),
            data: None,
            processing_time_ms: None,
            internal: JobInternal::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_competition_parse() {
        assert_eq!(Competition::parse("LOW"), Competition::Low);
        assert_eq!(Competition::parse(" medium "), Competition::Medium);
        assert_eq!(Competition::parse("high"), Competition::High);
        assert_eq!(Competition::parse("whatever"), Competition::Unknown);
    }

    #[test]
    fn test_competition_bucket() {
        assert_eq!(Competition::from_avg_value(1.0), Competition::Low);
        assert_eq!(Competition::from_avg_value(1.49), Competition::Low);
        assert_eq!(Competition::from_avg_value(1.5), Competition::Medium);
        assert_eq!(Competition::from_avg_value(2.49), Competition::Medium);
        assert_eq!(Competition::from_avg_value(2.5), Competition::High);
    }

    #[test]
    fn test_keyword_canonical() {
        let kw = Keyword::new("  Web Development ", 100, Competition::Low);
        assert_eq!(kw.canonical(), "web development");
        assert_eq!(kw.word_count(), 2);
    }

    #[test]
    fn test_keyword_cpc_ordering() {
        let kw = Keyword::new("x", 0, Competition::Low).with_cpc(2.5, 1.0);
        assert!(kw.cpc_high >= kw.cpc_low);
    }

    #[test]
    fn test_cluster_recompute_metrics() {
        let keywords = vec![
            Keyword::new("small", 100, Competition::Low),
            Keyword::new("big", 900, Competition::High),
        ];
        let cluster = Cluster::new(1, keywords, ClusterAlgorithm::Hybrid);

        assert_eq!(cluster.total_search_volume, 1000);
        assert_eq!(cluster.avg_search_volume, 500.0);
        // Sorted descending by volume
        assert_eq!(cluster.keywords[0].text, "big");
        // avg of low(1) and high(3) is 2.0 -> medium
        assert_eq!(cluster.avg_competition, Competition::Medium);
    }

    #[test]
    fn test_cluster_empty_metrics() {
        let cluster = Cluster::new(1, Vec::new(), ClusterAlgorithm::KMeans);
        assert_eq!(cluster.total_search_volume, 0);
        assert_eq!(cluster.avg_search_volume, 0.0);
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!(ClusterAlgorithm::parse("kmeans"), Some(ClusterAlgorithm::KMeans));
        assert_eq!(ClusterAlgorithm::parse("HYBRID"), Some(ClusterAlgorithm::Hybrid));
        assert_eq!(ClusterAlgorithm::parse("other"), None);
    }

    #[test]
    fn test_site_context_empty() {
        assert!(SiteContext::default().is_empty());
        let ctx = SiteContext {
            title: "Family Dentistry".to_string(),
            ..Default::default()
        };
        assert!(!ctx.is_empty());
    }
}
