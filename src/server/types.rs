//! HTTP API request/response types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ClusterAlgorithm, FetchMode, ResearchOptions};

/// Body of POST /api/research
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    pub url: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub options: Option<ResearchOptionsInput>,
}

/// Raw per-job options; strings are validated into the typed record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchOptionsInput {
    pub max_pages: Option<usize>,
    pub follow_links: Option<bool>,
    pub scrape_strategy: Option<String>,
    #[serde(alias = "algorithm")]
    pub cluster_algorithm: Option<String>,
    pub min_cluster_size: Option<usize>,
    #[serde(rename = "useAI", alias = "useAi")]
    pub use_ai: Option<bool>,
}

impl ResearchOptionsInput {
    /// Validate and clamp into the typed options record.
    pub fn resolve(self, default_max_pages: usize) -> Result<ResearchOptions, String> {
        let defaults = ResearchOptions {
            max_pages: default_max_pages,
            ..ResearchOptions::default()
        };

        let max_pages = self.max_pages.unwrap_or(defaults.max_pages).clamp(1, 100);
        let min_cluster_size = self
            .min_cluster_size
            .unwrap_or(defaults.min_cluster_size)
            .max(1);

        let scrape_strategy = match self.scrape_strategy {
            Some(raw) => FetchMode::parse(&raw)
                .ok_or_else(|| format!("invalid scrape strategy '{}'", raw))?,
            None => defaults.scrape_strategy,
        };
        let cluster_algorithm = match self.cluster_algorithm {
            Some(raw) => ClusterAlgorithm::parse(&raw)
                .ok_or_else(|| format!("invalid cluster algorithm '{}'", raw))?,
            None => defaults.cluster_algorithm,
        };

        Ok(ResearchOptions {
            max_pages,
            follow_links: self.follow_links.unwrap_or(defaults.follow_links),
            scrape_strategy,
            cluster_algorithm,
            min_cluster_size,
            use_ai: self.use_ai.unwrap_or(defaults.use_ai),
        })
    }
}

/// Response of POST /api/research
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub job_id: Uuid,
    pub status: &'static str,
}

/// Response of DELETE /api/research/:id
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub message: &'static str,
    pub job_id: Uuid,
}

/// Generic error body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            retry_after: None,
        }
    }
}

/// Response of GET /health
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub services: ServiceStatus,
}

/// Configured-collaborator readiness
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub metrics: bool,
    pub ai: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = ResearchOptionsInput::default().resolve(20).unwrap();
        assert_eq!(options.max_pages, 20);
        assert_eq!(options.min_cluster_size, 3);
        assert_eq!(options.cluster_algorithm, ClusterAlgorithm::Hybrid);
        assert!(options.use_ai);
    }

    #[test]
    fn test_options_clamping() {
        let input = ResearchOptionsInput {
            max_pages: Some(5000),
            min_cluster_size: Some(0),
            ..Default::default()
        };
        let options = input.resolve(20).unwrap();
        assert_eq!(options.max_pages, 100);
        assert_eq!(options.min_cluster_size, 1);
    }

    #[test]
    fn test_options_bad_algorithm_rejected() {
        let input = ResearchOptionsInput {
            cluster_algorithm: Some("recursive".to_string()),
            ..Default::default()
        };
        assert!(input.resolve(20).is_err());
    }

    #[test]
    fn test_options_algorithm_alias() {
        let input: ResearchOptionsInput =
            serde_json::from_str(r#"{"algorithm": "dbscan", "useAI": false}"#).unwrap();
        let options = input.resolve(20).unwrap();
        assert_eq!(options.cluster_algorithm, ClusterAlgorithm::Dbscan);
        assert!(!options.use_ai);
    }
}
