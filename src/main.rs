//! keyscout service binary

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keyscout::ai::{AiEnhancer, HttpAiClient};
use keyscout::config::{Config, LogFormat};
use keyscout::fetch::FetchEngine;
use keyscout::jobs::{JobStore, RateLimiter, ResearchPipeline};
use keyscout::metrics::KeywordMetricsClient;
use keyscout::server::{self, AppState};

#[derive(Parser)]
#[command(name = "keyscout")]
#[command(about = "Keyword research pipeline: crawl, enrich, cluster, rank")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "keyscout.toml")]
    config: PathBuf,

    /// Listen address override (e.g. "0.0.0.0:8080")
    #[arg(short, long)]
    listen: Option<String>,

    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::from_env()?
    };
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }

    init_logging(&config, cli.verbose);

    let config = Arc::new(config);
    let store = Arc::new(JobStore::new());
    let fetch = Arc::new(
        FetchEngine::new(&config.scraping, &config.services)
            .map_err(|e| anyhow::anyhow!("failed to build fetch engine: {}", e))?,
    );
    let metrics = Arc::new(
        KeywordMetricsClient::new(
            &config.services.metrics,
            config.clustering.min_search_volume,
            config.clustering.max_keywords,
        )
        .map_err(|e| anyhow::anyhow!("failed to build metrics client: {}", e))?,
    );
    let ai = if config.services.ai.is_configured() {
        let client = HttpAiClient::new(&config.services.ai)
            .map_err(|e| anyhow::anyhow!("failed to build AI client: {}", e))?;
        Some(Arc::new(AiEnhancer::new(Arc::new(client))))
    } else {
        warn!("no AI API key configured, running without AI enhancement");
        None
    };

    let pipeline = Arc::new(ResearchPipeline::new(
        Arc::clone(&config),
        Arc::clone(&store),
        fetch,
        metrics,
        ai,
    ));

    let (shutdown_tx, _) = broadcast::channel(1);
    store.spawn_sweeper(shutdown_tx.subscribe());

    let state = AppState {
        pipeline,
        limiter: Arc::new(RateLimiter::hourly(config.server.rate_limit_per_hour)),
        config: Arc::clone(&config),
        started_at: Instant::now(),
    };

    let server_shutdown = shutdown_tx.subscribe();
    let server_task = tokio::spawn(async move { server::serve(state, server_shutdown).await });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(());

    server_task.await??;
    info!("keyscout stopped");
    Ok(())
}

fn init_logging(config: &Config, verbosity: u8) {
    let level_override = match verbosity {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.filter_directive(level_override)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
