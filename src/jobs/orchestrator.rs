//! Per-job pipeline orchestration
//!
//! Each research job runs as one background task through strictly
//! sequential stages: probe, crawl, seed generation, metrics enrichment,
//! clustering, AI enhancement, finalization. Stage failures mark the job
//! failed with a stable label; AI trouble only ever produces warnings. The
//! cancel flag is observed at every stage boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::ai::{self, AiEnhancer};
use crate::cluster::ClusterEngine;
use crate::config::Config;
use crate::error::PipelineError;
use crate::fetch::FetchEngine;
use crate::metrics::MetricsProvider;
use crate::scrape::{ScrapeError, SiteCrawler};
use crate::seed::SeedGenerator;
use crate::types::{Cluster, Job, JobInternal, ResearchData, ResearchOptions, SiteContext};

use super::store::JobStore;

/// Progress signposts, percent by stage.
const PROGRESS_VALIDATING: u8 = 5;
const PROGRESS_SCANNING: u8 = 10;
const PROGRESS_EXTRACTING: u8 = 30;
const PROGRESS_ENRICHING: u8 = 50;
const PROGRESS_CLUSTERING: u8 = 70;
const PROGRESS_FINALIZING: u8 = 90;

/// Inputs to a research job, validated by the API layer.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub url: Url,
    pub country: String,
    pub requested_language: Option<String>,
    pub resolved_language: String,
    pub options: ResearchOptions,
    pub source_ip: Option<String>,
}

enum RunError {
    Cancelled,
    Failed(PipelineError),
}

impl From<PipelineError> for RunError {
    fn from(e: PipelineError) -> Self {
        RunError::Failed(e)
    }
}

/// The pipeline root: owns the collaborators and spawns job tasks.
pub struct ResearchPipeline {
    config: Arc<Config>,
    store: Arc<JobStore>,
    fetch: Arc<FetchEngine>,
    metrics: Arc<dyn MetricsProvider>,
    ai: Option<Arc<AiEnhancer>>,
}

impl ResearchPipeline {
    pub fn new(
        config: Arc<Config>,
        store: Arc<JobStore>,
        fetch: Arc<FetchEngine>,
        metrics: Arc<dyn MetricsProvider>,
        ai: Option<Arc<AiEnhancer>>,
    ) -> Self {
        Self {
            config,
            store,
            fetch,
            metrics,
            ai,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn ai_available(&self) -> bool {
        self.ai.is_some()
    }

    /// Create the job record and spawn its background task. Returns
    /// immediately with the job id.
    pub fn start_job(self: &Arc<Self>, request: JobRequest) -> Uuid {
        let mut job = Job::new(
            request.url.to_string(),
            request.country.clone(),
            request.requested_language.clone(),
            request.resolved_language.clone(),
            request.options.clone(),
        );
        job.internal = JobInternal {
            source_ip: request.source_ip.clone(),
            ai_requested: request.options.use_ai,
        };
        let id = job.id;
        let cancel = self.store.insert(job);

        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline.run_job(id, request, cancel).await;
        });

        info!("job {} started", id);
        id
    }

    async fn run_job(&self, id: Uuid, request: JobRequest, cancel: Arc<AtomicBool>) {
        let started = Instant::now();
        match self.execute(id, &request, &cancel).await {
            Ok(mut data) => {
                let elapsed = started.elapsed().as_millis() as u64;
                data.processing_time_ms = elapsed;
                info!(
                    "job {} completed: {} clusters, {} keywords in {}ms",
                    id, data.total_clusters, data.total_keywords, elapsed
                );
                self.store.mark_completed(&id, data, elapsed);
            }
            Err(RunError::Cancelled) => {
                info!("job {} cancelled", id);
            }
            Err(RunError::Failed(error)) => {
                warn!("job {} failed at {}: {}", id, error.stage(), error);
                self.store.mark_failed(&id, error.stage(), error.public_message());
            }
        }
    }

    async fn execute(
        &self,
        id: Uuid,
        request: &JobRequest,
        cancel: &AtomicBool,
    ) -> Result<ResearchData, RunError> {
        let options = &request.options;

        // Stage: validate reachability
        self.store.set_progress(&id, PROGRESS_VALIDATING, "validating");
        self.fetch
            .probe(&request.url)
            .await
            .map_err(|e| PipelineError::Unreachable(format!("URL is not reachable: {}", e)))?;
        self.check_cancel(cancel)?;

        // Stage: crawl
        self.store.set_progress(&id, PROGRESS_SCANNING, "scanning");
        if options.scrape_strategy == crate::types::FetchMode::Auto && !self.fetch.has_browser() {
            warn!("job {}: no rendering service configured, crawling over plain http", id);
        }
        let crawler = SiteCrawler::new(&self.fetch);
        let scrape = crawler
            .crawl(
                &request.url,
                options.scrape_strategy,
                options.max_pages,
                options.follow_links,
                cancel,
            )
            .await
            .map_err(|e| match e {
                ScrapeError::Cancelled => RunError::Cancelled,
                ScrapeError::AllStrategiesFailed => {
                    RunError::Failed(PipelineError::Unreachable(e.to_string()))
                }
            })?;
        self.check_cancel(cancel)?;

        let context = SiteContext::from_scrape(request.url.as_str(), &scrape);

        // Stage: seed keywords
        self.store.set_progress(&id, PROGRESS_EXTRACTING, "extracting seeds");
        let ai = if options.use_ai { self.ai.clone() } else { None };
        let seeder = SeedGenerator::new(ai.clone(), self.config.clustering.max_seeds);
        let outcome = seeder.generate(&scrape, &request.resolved_language).await;
        if let Some(warning) = outcome.warning {
            self.store.add_warning(&id, warning);
        }
        if outcome.seeds.is_empty() {
            return Err(PipelineError::NoSeeds.into());
        }
        let seed_count = outcome.seeds.len();
        self.check_cancel(cancel)?;

        // Stage: metrics enrichment
        self.store.set_progress(&id, PROGRESS_ENRICHING, "fetching metrics");
        let keywords = self
            .metrics
            .keyword_metrics(&outcome.seeds, &request.country, &request.resolved_language)
            .await
            .map_err(|e| {
                warn!("job {}: metrics provider failed: {}", id, e);
                PipelineError::NoMetrics
            })?;
        if keywords.is_empty() {
            return Err(PipelineError::NoMetrics.into());
        }
        self.check_cancel(cancel)?;

        // Stage: clustering
        self.store.set_progress(&id, PROGRESS_CLUSTERING, "clustering");
        let engine = ClusterEngine::new(&self.config.clustering)
            .with_min_cluster_size(options.min_cluster_size);
        // The engine fails when clustering yields nothing before the
        // relevance filter; a set emptied by the filter alone still
        // completes, with zero clusters.
        let mut clusters = engine
            .cluster_keywords(&keywords, options.cluster_algorithm, Some(&context))
            .map_err(|_| PipelineError::ClusterEmpty)?;
        self.check_cancel(cancel)?;

        // AI enhancement is best-effort throughout.
        if let Some(ai) = &ai {
            clusters = self
                .enhance_clusters(id, ai, &engine, clusters, &keywords, &context, request, cancel)
                .await?;
        }
        for cluster in clusters.iter_mut() {
            ai::fill_narratives(cluster, &context);
        }

        // Stage: finalize
        self.store.set_progress(&id, PROGRESS_FINALIZING, "finalizing");
        let total_keywords = clusters.iter().map(|c| c.keyword_count()).sum();
        Ok(ResearchData {
            url: request.url.to_string(),
            country: request.country.clone(),
            language: request.resolved_language.clone(),
            total_keywords,
            total_clusters: clusters.len(),
            clusters,
            pages_scanned: scrape.pages.len(),
            seed_count,
            scrape_strategy: scrape.strategy,
            processing_time_ms: 0, // stamped on completion
        })
    }

    /// Run the three AI passes, downgrading every failure to a warning.
    #[allow(clippy::too_many_arguments)]
    async fn enhance_clusters(
        &self,
        id: Uuid,
        ai: &Arc<AiEnhancer>,
        engine: &ClusterEngine,
        mut clusters: Vec<Cluster>,
        keywords: &[crate::types::Keyword],
        context: &SiteContext,
        request: &JobRequest,
        cancel: &AtomicBool,
    ) -> Result<Vec<Cluster>, RunError> {
        let language = &request.resolved_language;

        match ai
            .regroup_suggestions(&clusters, context, keywords, language)
            .await
        {
            Ok(suggestions) => engine.apply_regroup(&mut clusters, &suggestions),
            Err(e) => {
                self.store
                    .add_warning(&id, format!("AI regroup suggestions failed: {}", e));
            }
        }
        self.check_cancel(cancel)?;

        match ai.scrutinize(&clusters, keywords, context, language).await {
            Ok(report) => {
                clusters = engine.apply_scrutiny(clusters, &report, Some(context));
            }
            Err(e) => {
                self.store
                    .add_warning(&id, format!("AI cluster audit failed: {}", e));
            }
        }
        self.check_cancel(cancel)?;

        for index in 0..clusters.len() {
            match ai.enhance_cluster(&clusters[index], context, language).await {
                Ok(enhancement) => {
                    let cluster = &mut clusters[index];
                    if let Some(pillar) = enhancement.pillar_topic {
                        if !pillar.trim().is_empty() {
                            cluster.pillar_topic = pillar.trim().to_string();
                        }
                    }
                    if !enhancement.description.is_empty() {
                        cluster.ai_description = Some(enhancement.description);
                    }
                    if !enhancement.content_strategy.is_empty() {
                        cluster.ai_content_strategy = Some(enhancement.content_strategy);
                    }
                }
                Err(e) => {
                    self.store.add_warning(
                        &id,
                        format!(
                            "AI enhancement failed for cluster \"{}\": {}",
                            clusters[index].pillar_topic, e
                        ),
                    );
                }
            }
            self.check_cancel(cancel)?;
        }

        Ok(clusters)
    }

    fn check_cancel(&self, cancel: &AtomicBool) -> Result<(), RunError> {
        if cancel.load(Ordering::Relaxed) {
            Err(RunError::Cancelled)
        } else {
            Ok(())
        }
    }
}
