//! keyscout: asynchronous keyword-research pipeline
//!
//! Given a website URL, a target market and a target language, keyscout:
//! - crawls same-origin pages and extracts structured content
//! - generates seed keywords (AI with a deterministic fallback)
//! - enriches seeds with search-volume/competition/CPC metrics
//! - clusters keywords into ranked topic clusters (k-means, DBSCAN,
//!   semantic, or the hybrid default)
//! - optionally lets an AI pass rename, audit and describe the clusters
//!
//! Jobs run as background tasks with progress reporting, cancellation,
//! per-IP rate limiting and a 24-hour retention TTL, exposed over an HTTP
//! JSON API.

pub mod ai;
pub mod cluster;
pub mod config;
pub mod error;
pub mod fetch;
pub mod jobs;
pub mod metrics;
pub mod scrape;
pub mod seed;
pub mod server;
pub mod text;
pub mod types;
pub mod util;

pub use config::Config;
pub use error::PipelineError;
pub use types::*;
