//! End-to-end tests for the research pipeline
//!
//! These exercise the pipeline with in-memory collaborator doubles: a
//! fixture site behind the fetch engine, a scripted metrics provider, and
//! no AI. Nothing here touches the network.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use keyscout::cluster::{ensure_unique_keywords, ClusterEngine};
use keyscout::config::{ClusteringConfig, Config};
use keyscout::fetch::{FetchEngine, FetchError, FetchedPage, PageFetcher};
use keyscout::jobs::{JobRequest, JobStore, RateLimiter, ResearchPipeline};
use keyscout::metrics::{MetricsError, MetricsProvider};
use keyscout::server::export;
use keyscout::types::{
    Cluster, ClusterAlgorithm, Competition, FetchMode, JobStatus, Keyword, ResearchData,
    ResearchOptions, ScrapeStrategy, SiteContext,
};

// ---------------------------------------------------------------------------
// Collaborator doubles
// ---------------------------------------------------------------------------

/// Serves canned HTML per URL path.
struct FixtureSite {
    pages: HashMap<String, String>,
    strategy: ScrapeStrategy,
}

#[async_trait]
impl PageFetcher for FixtureSite {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        match self.pages.get(url.path()) {
            Some(html) => Ok(FetchedPage {
                final_url: url.clone(),
                status: 200,
                html: html.clone(),
            }),
            None => Err(FetchError::Status(404)),
        }
    }

    fn strategy(&self) -> ScrapeStrategy {
        self.strategy
    }
}

/// Browser double that fails every attempt.
struct BrokenBrowser;

#[async_trait]
impl PageFetcher for BrokenBrowser {
    async fn fetch(&self, _url: &Url) -> Result<FetchedPage, FetchError> {
        Err(FetchError::Render {
            status: 500,
            message: "renderer crashed".to_string(),
        })
    }

    fn strategy(&self) -> ScrapeStrategy {
        ScrapeStrategy::Browser
    }
}

/// Metrics double returning a fixed keyword list.
struct ScriptedMetrics {
    keywords: Vec<Keyword>,
}

#[async_trait]
impl MetricsProvider for ScriptedMetrics {
    async fn keyword_metrics(
        &self,
        _seeds: &[String],
        _country: &str,
        _language: &str,
    ) -> Result<Vec<Keyword>, MetricsError> {
        Ok(self.keywords.clone())
    }
}

fn fixture_html() -> String {
    r#"<html>
    <head>
        <title>Acme Web Agency Zurich</title>
        <meta name="description" content="Web development, web design and seo services for growing businesses">
    </head>
    <body>
        <h1>Web Development Agency</h1>
        <h2>Seo Services</h2>
        <h2>Digital Marketing</h2>
        <p>We build modern websites and deliver seo services plus digital marketing campaigns for companies in Zurich and beyond.</p>
        <p>Our web development team covers frontend development and backend development with equal depth and care.</p>
        <a href="/services">Seo services overview</a>
        <a href="/work">Recent client work</a>
    </body>
    </html>"#
        .to_string()
}

fn fixture_engine() -> Arc<FetchEngine> {
    let mut pages = HashMap::new();
    pages.insert("/".to_string(), fixture_html());
    pages.insert("/services".to_string(), fixture_html());
    pages.insert("/work".to_string(), fixture_html());
    Arc::new(FetchEngine::with_strategies(
        Some(Arc::new(BrokenBrowser)),
        Arc::new(FixtureSite {
            pages,
            strategy: ScrapeStrategy::Http,
        }),
        2,
    ))
}

/// The S1 keyword set.
fn sample_keywords() -> Vec<Keyword> {
    vec![
        Keyword::new("web development", 10_000, Competition::Medium),
        Keyword::new("web design", 8_000, Competition::Low),
        Keyword::new("frontend development", 5_000, Competition::Medium),
        Keyword::new("backend development", 4_000, Competition::High),
        Keyword::new("seo services", 12_000, Competition::High),
        Keyword::new("seo optimization", 9_000, Competition::Medium),
        Keyword::new("digital marketing", 15_000, Competition::High),
        Keyword::new("content marketing", 7_000, Competition::Medium),
    ]
}

fn pipeline_with(keywords: Vec<Keyword>) -> Arc<ResearchPipeline> {
    Arc::new(ResearchPipeline::new(
        Arc::new(Config::default()),
        Arc::new(JobStore::new()),
        fixture_engine(),
        Arc::new(ScriptedMetrics { keywords }),
        None,
    ))
}

fn job_request(options: ResearchOptions) -> JobRequest {
    JobRequest {
        url: Url::parse("https://acme.example/").unwrap(),
        country: "2756".to_string(),
        requested_language: None,
        resolved_language: "de".to_string(),
        options,
        source_ip: None,
    }
}

async fn wait_for_terminal(store: &JobStore, id: &uuid::Uuid) -> keyscout::types::Job {
    for _ in 0..500 {
        if let Some(job) = store.get(id) {
            if job.status.is_terminal() {
                return job;
            }
        } else {
            panic!("job disappeared while waiting");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job did not reach a terminal state");
}

fn assert_unique_keywords(clusters: &[Cluster]) {
    let mut seen = std::collections::HashSet::new();
    for cluster in clusters {
        for keyword in &cluster.keywords {
            assert!(
                seen.insert(keyword.canonical()),
                "{} appears in more than one cluster",
                keyword.text
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Tiny valid pipeline over the sample keyword set.
#[test]
fn tiny_pipeline_clusters_sample_keywords() {
    let engine = ClusterEngine::new(&ClusteringConfig::default()).with_min_cluster_size(2);
    let clusters = engine
        .cluster_keywords(&sample_keywords(), ClusterAlgorithm::Hybrid, None)
        .unwrap();

    assert!(clusters.len() >= 2, "expected at least two clusters");
    assert_unique_keywords(&clusters);

    let total: usize = clusters.iter().map(|c| c.keyword_count()).sum();
    assert_eq!(total, sample_keywords().len());

    let seo = clusters
        .iter()
        .find(|c| c.contains_keyword("seo services"))
        .expect("seo services must be clustered");
    assert!(seo.contains_keyword("seo optimization"));

    for cluster in &clusters {
        assert!((0.0..=100.0).contains(&cluster.cluster_value_score));
    }
    let mut ranks: Vec<u32> = clusters.iter().map(|c| c.rank).collect();
    ranks.sort();
    assert_eq!(ranks, (1..=clusters.len() as u32).collect::<Vec<_>>());
}

/// Uniqueness under merge: a shared keyword stays with the closer pillar.
#[test]
fn shared_keyword_resolves_to_closest_pillar() {
    let mut a = Cluster::new(
        1,
        vec![
            Keyword::new("seo services", 1000, Competition::Low),
            Keyword::new("seo audit", 900, Competition::Low),
        ],
        ClusterAlgorithm::Hybrid,
    );
    a.pillar_topic = "seo".to_string();
    let mut b = Cluster::new(
        2,
        vec![
            Keyword::new("seo services", 1000, Competition::Low),
            Keyword::new("content marketing", 800, Competition::Low),
        ],
        ClusterAlgorithm::Hybrid,
    );
    b.pillar_topic = "marketing".to_string();

    let unique = ensure_unique_keywords(vec![a, b], 1);
    assert_unique_keywords(&unique);
    let owner = unique
        .iter()
        .find(|c| c.contains_keyword("seo services"))
        .unwrap();
    assert_eq!(owner.id, 1);
}

/// Relevance filtering against a dentistry context removes the off-topic
/// cluster entirely.
#[test]
fn relevance_filter_removes_off_topic_keywords() {
    let context = SiteContext {
        url: "https://example.com/dentistry".to_string(),
        title: "Family Dentistry in Zurich".to_string(),
        description: "Dental cleaning and implants for the whole family".to_string(),
        page_titles: vec!["Dental Cleaning".to_string()],
        meta_descriptions: Vec::new(),
        focus_terms: vec!["Dental Implants".to_string()],
    };
    let keywords = vec![
        Keyword::new("dental cleaning", 2000, Competition::Low),
        Keyword::new("dental implants", 1500, Competition::Medium),
        Keyword::new("family dentistry", 1200, Competition::Low),
        Keyword::new("car insurance", 9000, Competition::High),
        Keyword::new("cheap car insurance", 7000, Competition::High),
        Keyword::new("car insurance quotes", 6000, Competition::High),
    ];

    let engine = ClusterEngine::new(&ClusteringConfig::default()).with_min_cluster_size(2);
    let clusters = engine
        .cluster_keywords(&keywords, ClusterAlgorithm::Semantic, Some(&context))
        .unwrap();

    let all: Vec<String> = clusters
        .iter()
        .flat_map(|c| c.keywords.iter().map(|k| k.canonical()))
        .collect();
    assert!(all.contains(&"dental cleaning".to_string()));
    assert!(!all.contains(&"car insurance".to_string()));
    assert!(!clusters.iter().any(|c| c.pillar_topic.contains("insurance")));
}

/// CSV export: header plus one row per keyword, score to two decimals.
#[test]
fn csv_export_shape() {
    let mut first = Cluster::new(
        1,
        vec![
            Keyword::new("seo services", 1000, Competition::High).with_cpc(1.5, 3.0),
            Keyword::new("seo audit", 500, Competition::Medium).with_cpc(1.0, 2.0),
        ],
        ClusterAlgorithm::Hybrid,
    );
    first.pillar_topic = "seo services".to_string();
    first.cluster_value_score = 71.0;
    let mut second = Cluster::new(
        2,
        vec![Keyword::new("web design", 800, Competition::Low).with_cpc(0.5, 0.9)],
        ClusterAlgorithm::Hybrid,
    );
    second.pillar_topic = "web design".to_string();
    second.cluster_value_score = 64.0;

    let data = ResearchData {
        url: "https://example.com".to_string(),
        country: "2756".to_string(),
        language: "de".to_string(),
        total_keywords: 3,
        total_clusters: 2,
        clusters: vec![first, second],
        pages_scanned: 3,
        seed_count: 25,
        scrape_strategy: ScrapeStrategy::Http,
        processing_time_ms: 900,
    };

    let csv = export::to_csv(&data);
    let lines: Vec<&str> = csv.trim_end().lines().collect();
    assert_eq!(lines.len(), 4, "header plus three keyword rows");
    assert_eq!(
        lines[0],
        "Cluster ID,Pillar Topic,Keyword,Search Volume,Competition,CPC Low,CPC High,Cluster Value Score,Cluster Total Volume"
    );
    assert!(lines[1].contains("71.00"));

    // JSON and CSV agree on the keyword count.
    let json: serde_json::Value = serde_json::from_str(&export::to_json(&data)).unwrap();
    let json_count: usize = json["clusters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["keywords"].as_array().unwrap().len())
        .sum();
    assert_eq!(lines.len() - 1, json_count);
}

/// Rate limit: the 11th request inside the window is rejected with a
/// positive retry-after.
#[test]
fn rate_limit_eleventh_request() {
    let limiter = RateLimiter::hourly(10);
    let ip = "203.0.113.7".parse().unwrap();
    for _ in 0..10 {
        assert!(limiter.check(ip).is_ok());
    }
    let retry_after = limiter.check(ip).unwrap_err();
    assert!(retry_after > 0);
}

/// Scrape fallback: the browser strategy fails every attempt, plain HTTP
/// succeeds, and the job completes with the http strategy tag.
#[tokio::test]
async fn scrape_falls_back_to_http_and_completes() {
    let pipeline = pipeline_with(sample_keywords());
    let options = ResearchOptions {
        scrape_strategy: FetchMode::Auto,
        use_ai: false,
        min_cluster_size: 2,
        ..ResearchOptions::default()
    };
    let id = pipeline.start_job(job_request(options));

    let job = wait_for_terminal(pipeline.store(), &id).await;
    assert_eq!(job.status, JobStatus::Completed, "error: {:?}", job.error);
    assert_eq!(job.progress, 100);

    let data = job.data.expect("completed job carries data");
    assert_eq!(data.scrape_strategy, ScrapeStrategy::Http);
    assert!(data.pages_scanned >= 1);
    assert!(data.total_clusters >= 1);
    assert_unique_keywords(&data.clusters);
    // Narrative fallback fills descriptions without AI.
    assert!(data
        .clusters
        .iter()
        .all(|c| c.ai_description.is_some() && c.ai_content_strategy.is_some()));
}

/// Empty metrics fail the job at the enriching stage.
#[tokio::test]
async fn empty_metrics_fail_job() {
    let pipeline = pipeline_with(Vec::new());
    let options = ResearchOptions {
        use_ai: false,
        ..ResearchOptions::default()
    };
    let id = pipeline.start_job(job_request(options));

    let job = wait_for_terminal(pipeline.store(), &id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.step, "enriching");
}

/// Deleting a job makes it invisible and flags cancellation.
#[tokio::test]
async fn deleted_job_is_gone() {
    let pipeline = pipeline_with(sample_keywords());
    let options = ResearchOptions {
        use_ai: false,
        ..ResearchOptions::default()
    };
    let id = pipeline.start_job(job_request(options));

    assert!(pipeline.store().delete(&id));
    assert!(pipeline.store().get(&id).is_none());
    // A second delete reports not-found.
    assert!(!pipeline.store().delete(&id));
}

/// maxPages=1 crawls exactly one page.
#[tokio::test]
async fn max_pages_one_scans_single_page() {
    let pipeline = pipeline_with(sample_keywords());
    let options = ResearchOptions {
        max_pages: 1,
        use_ai: false,
        min_cluster_size: 2,
        ..ResearchOptions::default()
    };
    let id = pipeline.start_job(job_request(options));

    let job = wait_for_terminal(pipeline.store(), &id).await;
    assert_eq!(job.status, JobStatus::Completed, "error: {:?}", job.error);
    assert_eq!(job.data.unwrap().pages_scanned, 1);
}
