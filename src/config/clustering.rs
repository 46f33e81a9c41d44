//! Clustering and keyword-intake configuration

use serde::{Deserialize, Serialize};

/// Clustering engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Smallest cluster kept in the final set
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
    /// Lower bound on k for k-means
    #[serde(default = "default_min_clusters")]
    pub min_clusters: usize,
    /// Upper bound on k for k-means
    #[serde(default = "default_max_clusters")]
    pub max_clusters: usize,
    /// Cap on keywords accepted from the metrics provider
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
    /// Keywords below this monthly volume are dropped at intake
    #[serde(default = "default_min_search_volume")]
    pub min_search_volume: u64,
    /// Cap on seed keywords sent to the metrics provider
    #[serde(default = "default_max_seeds")]
    pub max_seeds: usize,
}

fn default_min_cluster_size() -> usize {
    3
}

fn default_min_clusters() -> usize {
    3
}

fn default_max_clusters() -> usize {
    20
}

fn default_max_keywords() -> usize {
    500
}

fn default_min_search_volume() -> u64 {
    10
}

fn default_max_seeds() -> usize {
    150
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: default_min_cluster_size(),
            min_clusters: default_min_clusters(),
            max_clusters: default_max_clusters(),
            max_keywords: default_max_keywords(),
            min_search_volume: default_min_search_volume(),
            max_seeds: default_max_seeds(),
        }
    }
}
