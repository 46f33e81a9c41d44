//! Topic clustering engine
//!
//! Turns a flat keyword list into ranked topic clusters. Four algorithms
//! are available (k-means, DBSCAN, greedy semantic, and the default hybrid
//! which refines k-means output), followed by shared post-processing:
//! keyword-uniqueness enforcement, relevance filtering against the site
//! context, value scoring and ranking.

mod dbscan;
mod kmeans;
mod refine;
mod relevance;
mod score;
mod semantic;
mod vectorize;

pub use refine::{cluster_similarity, coherence, ensure_unique_keywords, select_pillar};
pub use relevance::apply_relevance_scores;
pub use score::{cluster_value_score, sort_and_rank_clusters};

use thiserror::Error;
use tracing::debug;

use crate::ai::{RegroupSuggestions, ScrutinyReport};
use crate::config::ClusteringConfig;
use crate::text::similarity;
use crate::types::{Cluster, ClusterAlgorithm, Keyword, SiteContext};

/// Similarity needed to attach a DBSCAN noise point to a cluster.
const NOISE_ATTACH_THRESHOLD: f64 = 0.3;

/// Errors from the clustering engine
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("clustering produced no clusters")]
    Empty,
}

/// The clustering engine. Cheap to construct; one instance per job carries
/// the job's minimum cluster size.
pub struct ClusterEngine {
    min_cluster_size: usize,
    min_clusters: usize,
    max_clusters: usize,
}

impl ClusterEngine {
    pub fn new(config: &ClusteringConfig) -> Self {
        Self {
            min_cluster_size: config.min_cluster_size,
            min_clusters: config.min_clusters,
            max_clusters: config.max_clusters,
        }
    }

    /// Override the minimum cluster size for one job.
    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size.max(1);
        self
    }

    pub fn min_cluster_size(&self) -> usize {
        self.min_cluster_size
    }

    /// Cluster the keyword set end to end.
    ///
    /// Zero keywords yield an empty cluster list; fewer keywords than the
    /// minimum cluster size yield exactly one cluster holding all of them.
    pub fn cluster_keywords(
        &self,
        keywords: &[Keyword],
        algorithm: ClusterAlgorithm,
        context: Option<&SiteContext>,
    ) -> Result<Vec<Cluster>, ClusterError> {
        let keywords = dedup_keywords(keywords);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let mut next_id: u32 = 1;

        if keywords.len() < self.min_cluster_size {
            let mut cluster = Cluster::new(next_id, keywords, algorithm);
            select_pillar(&mut cluster);
            let clusters = apply_relevance_scores(vec![cluster], context, self.min_cluster_size);
            return Ok(sort_and_rank_clusters(clusters));
        }

        let groups = match algorithm {
            ClusterAlgorithm::KMeans => self.kmeans_groups(&keywords),
            ClusterAlgorithm::Dbscan => self.dbscan_groups(&keywords),
            ClusterAlgorithm::Semantic => semantic::semantic_groups(&keywords, self.min_cluster_size),
            ClusterAlgorithm::Hybrid => self.kmeans_groups(&keywords),
        };

        let mut clusters: Vec<Cluster> = groups
            .into_iter()
            .filter(|group| !group.is_empty())
            .map(|group| {
                let members = group.into_iter().map(|i| keywords[i].clone()).collect();
                let mut cluster = Cluster::new(next_id, members, algorithm);
                next_id += 1;
                select_pillar(&mut cluster);
                cluster
            })
            .collect();

        if algorithm == ClusterAlgorithm::Hybrid {
            clusters = refine::refine_with_semantics(clusters, self.min_cluster_size, &mut next_id);
            clusters = refine::merge_similar_clusters(clusters);
            clusters = refine::split_mixed_clusters(clusters, self.min_cluster_size, &mut next_id);
        }

        clusters = ensure_unique_keywords(clusters, self.min_cluster_size);
        if clusters.is_empty() {
            return Err(ClusterError::Empty);
        }

        debug!(
            "{} produced {} clusters from {} keywords",
            algorithm.as_str(),
            clusters.len(),
            keywords.len()
        );

        let clusters = apply_relevance_scores(clusters, context, self.min_cluster_size);
        Ok(sort_and_rank_clusters(clusters))
    }

    fn kmeans_groups(&self, keywords: &[Keyword]) -> Vec<Vec<usize>> {
        let vectors = vectorize::build_feature_vectors(keywords);
        let k = kmeans::KMeans::choose_k(keywords.len(), self.min_clusters, self.max_clusters);
        let assignments = kmeans::KMeans::new(k).fit(&vectors);

        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); k];
        for (index, &assignment) in assignments.iter().enumerate() {
            groups[assignment].push(index);
        }
        groups
    }

    fn dbscan_groups(&self, keywords: &[Keyword]) -> Vec<Vec<usize>> {
        let matrix = dbscan::distance_matrix(keywords);
        let labels = dbscan::dbscan(&matrix, dbscan::DBSCAN_EPSILON, dbscan::DBSCAN_MIN_POINTS);

        let cluster_count = labels.iter().flatten().max().map_or(0, |&m| m + 1);
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); cluster_count];
        let mut noise: Vec<usize> = Vec::new();
        for (index, label) in labels.iter().enumerate() {
            match label {
                Some(cluster) => groups[*cluster].push(index),
                None => noise.push(index),
            }
        }

        // Re-home noise points to the cluster whose top keywords they best
        // match; leftovers pool into a misc group when numerous enough.
        let mut misc: Vec<usize> = Vec::new();
        for point in noise {
            let mut best: Option<(usize, f64)> = None;
            for (group_index, group) in groups.iter().enumerate() {
                if group.is_empty() {
                    continue;
                }
                let mut top: Vec<usize> = group.clone();
                top.sort_by(|&a, &b| keywords[b].search_volume.cmp(&keywords[a].search_volume));
                top.truncate(5);
                let avg: f64 = top
                    .iter()
                    .map(|&i| similarity(&keywords[point].text, &keywords[i].text))
                    .sum::<f64>()
                    / top.len() as f64;
                if best.map_or(true, |(_, s)| avg > s) {
                    best = Some((group_index, avg));
                }
            }
            match best {
                Some((group_index, avg)) if avg > NOISE_ATTACH_THRESHOLD => {
                    groups[group_index].push(point)
                }
                _ => misc.push(point),
            }
        }
        if misc.len() >= self.min_cluster_size {
            groups.push(misc);
        }

        groups
    }

    /// Apply AI regrouping suggestions: renames by cluster position and
    /// priority flags. Out-of-range indices are ignored.
    pub fn apply_regroup(&self, clusters: &mut [Cluster], suggestions: &RegroupSuggestions) {
        for rename in &suggestions.renames {
            if let Some(cluster) = clusters.get_mut(rename.index) {
                if !rename.name.trim().is_empty() {
                    cluster.pillar_topic = rename.name.trim().to_string();
                }
            }
        }
        for &index in &suggestions.priority_indices {
            if let Some(cluster) = clusters.get_mut(index) {
                cluster.ai_priority = true;
            }
        }
    }

    /// Apply the AI scrutiny report: renames, then merges, then individual
    /// keyword reassignments. Every move goes through the uniqueness-
    /// preserving assignment; metrics are recomputed and empty clusters
    /// dropped before the set is re-ranked by the caller.
    pub fn apply_scrutiny(
        &self,
        mut clusters: Vec<Cluster>,
        report: &ScrutinyReport,
        context: Option<&SiteContext>,
    ) -> Vec<Cluster> {
        for rename in &report.renames {
            if let Some(cluster) = clusters.iter_mut().find(|c| c.id == rename.cluster_id) {
                if !rename.name.trim().is_empty() {
                    cluster.pillar_topic = rename.name.trim().to_string();
                }
            }
        }

        for merge in &report.merges {
            let (from_id, into_id) = (merge.0, merge.1);
            if from_id == into_id {
                continue;
            }
            let Some(from_index) = clusters.iter().position(|c| c.id == from_id) else {
                continue;
            };
            if !clusters.iter().any(|c| c.id == into_id) {
                continue;
            }
            let moved: Vec<Keyword> = clusters[from_index].keywords.drain(..).collect();
            debug!("scrutiny merge: cluster {} into {}", from_id, into_id);
            for keyword in moved {
                apply_keyword_assignment(&mut clusters, &keyword, into_id);
            }
        }

        for reassignment in &report.reassignments {
            let Some(keyword) = clusters
                .iter()
                .flat_map(|c| c.keywords.iter())
                .find(|k| k.canonical() == reassignment.keyword.trim().to_lowercase())
                .cloned()
            else {
                continue;
            };
            if clusters.iter().any(|c| c.id == reassignment.to_cluster) {
                apply_keyword_assignment(&mut clusters, &keyword, reassignment.to_cluster);
            }
        }

        clusters.retain(|c| !c.keywords.is_empty());
        for cluster in clusters.iter_mut() {
            cluster.recompute_metrics();
            if cluster.pillar_topic.is_empty() {
                select_pillar(cluster);
            }
        }

        let clusters = ensure_unique_keywords(clusters, self.min_cluster_size);
        let clusters = apply_relevance_scores(clusters, context, self.min_cluster_size);
        sort_and_rank_clusters(clusters)
    }
}

/// Move a keyword to the target cluster, removing it everywhere else. The
/// keyword is not duplicated when the target already holds it.
fn apply_keyword_assignment(clusters: &mut [Cluster], keyword: &Keyword, target_id: u32) {
    let canonical = keyword.canonical();
    for cluster in clusters.iter_mut() {
        if cluster.id != target_id {
            cluster.keywords.retain(|k| k.canonical() != canonical);
        }
    }
    if let Some(target) = clusters.iter_mut().find(|c| c.id == target_id) {
        if !target.contains_keyword(&canonical) {
            target.keywords.push(keyword.clone());
        }
    }
}

/// Drop keywords whose canonical text repeats, keeping provider order.
fn dedup_keywords(keywords: &[Keyword]) -> Vec<Keyword> {
    let mut seen = std::collections::HashSet::new();
    keywords
        .iter()
        .filter(|k| seen.insert(k.canonical()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ClusterRename, KeywordReassignment, ScrutinyRename};
    use crate::types::Competition;

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

    fn engine() -> ClusterEngine {
        ClusterEngine::new(&ClusteringConfig::default()).with_min_cluster_size(2)
    }

    fn assert_unique(clusters: &[Cluster]) {
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

    #[test]
    fn test_hybrid_end_to_end() {
        let clusters = engine()
            .cluster_keywords(&sample_keywords(), ClusterAlgorithm::Hybrid, None)
            .unwrap();

        assert!(clusters.len() >= 2);
        assert_unique(&clusters);

        // The two seo keywords belong together.
        let seo_cluster = clusters
            .iter()
            .find(|c| c.contains_keyword("seo services"))
            .unwrap();
        assert!(seo_cluster.contains_keyword("seo optimization"));

        for cluster in &clusters {
            assert!((0.0..=100.0).contains(&cluster.cluster_value_score));
            let expected: u64 = cluster.keywords.iter().map(|k| k.search_volume).sum();
            assert_eq!(cluster.total_search_volume, expected);
        }

        let mut ranks: Vec<u32> = clusters.iter().map(|c| c.rank).collect();
        ranks.sort();
        assert_eq!(ranks, (1..=clusters.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn test_all_algorithms_cover_every_keyword_at_most_once() {
        let keywords = sample_keywords();
        for algorithm in [
            ClusterAlgorithm::KMeans,
            ClusterAlgorithm::Dbscan,
            ClusterAlgorithm::Semantic,
            ClusterAlgorithm::Hybrid,
        ] {
            let clusters = engine()
                .cluster_keywords(&keywords, algorithm, None)
                .unwrap_or_default();
            assert_unique(&clusters);
        }
    }

    #[test]
    fn test_empty_input() {
        let clusters = engine()
            .cluster_keywords(&[], ClusterAlgorithm::Hybrid, None)
            .unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_small_input_single_cluster() {
        let keywords = vec![
            Keyword::new("seo", 100, Competition::Low),
            Keyword::new("sem", 90, Competition::Low),
        ];
        let clusters = ClusterEngine::new(&ClusteringConfig::default())
            .cluster_keywords(&keywords, ClusterAlgorithm::Hybrid, None)
            .unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].keyword_count(), 2);
        assert_eq!(clusters[0].rank, 1);
    }

    #[test]
    fn test_duplicate_input_collapsed() {
        let keywords = vec![
            Keyword::new("seo services", 100, Competition::Low),
            Keyword::new("SEO Services", 100, Competition::Low),
        ];
        let clusters = ClusterEngine::new(&ClusteringConfig::default())
            .cluster_keywords(&keywords, ClusterAlgorithm::Hybrid, None)
            .unwrap();
        assert_eq!(clusters[0].keyword_count(), 1);
    }

    #[test]
    fn test_apply_regroup() {
        let mut clusters = engine()
            .cluster_keywords(&sample_keywords(), ClusterAlgorithm::Hybrid, None)
            .unwrap();
        let suggestions = RegroupSuggestions {
            renames: vec![ClusterRename {
                index: 0,
                name: "Web Engineering".to_string(),
            }],
            priority_indices: vec![0],
        };
        engine().apply_regroup(&mut clusters, &suggestions);
        assert_eq!(clusters[0].pillar_topic, "Web Engineering");
        assert!(clusters[0].ai_priority);
    }

    #[test]
    fn test_apply_scrutiny_merge_preserves_uniqueness() {
        let e = engine();
        let clusters = e
            .cluster_keywords(&sample_keywords(), ClusterAlgorithm::Hybrid, None)
            .unwrap();
        if clusters.len() < 2 {
            return;
        }
        let from = clusters[1].id;
        let into = clusters[0].id;
        let report = ScrutinyReport {
            reassignments: Vec::new(),
            merges: vec![(from, into)],
            renames: vec![ScrutinyRename {
                cluster_id: into,
                name: "Merged Topics".to_string(),
            }],
        };
        let merged = e.apply_scrutiny(clusters, &report, None);
        assert_unique(&merged);
        assert!(merged.iter().all(|c| !c.keywords.is_empty()));
        assert!(merged.iter().any(|c| c.pillar_topic == "Merged Topics"));
    }

    #[test]
    fn test_apply_scrutiny_reassignment() {
        let e = engine();
        let clusters = e
            .cluster_keywords(&sample_keywords(), ClusterAlgorithm::Hybrid, None)
            .unwrap();
        if clusters.len() < 2 {
            return;
        }
        let keyword = clusters[1].keywords[0].text.clone();
        let target = clusters[0].id;
        let report = ScrutinyReport {
            reassignments: vec![KeywordReassignment {
                keyword: keyword.clone(),
                to_cluster: target,
            }],
            merges: Vec::new(),
            renames: Vec::new(),
        };
        let updated = e.apply_scrutiny(clusters, &report, None);
        assert_unique(&updated);
    }

    #[test]
    fn test_uniqueness_under_merge_scenario() {
        // Two clusters share "seo services"; it must end up only in the
        // cluster whose pillar it better matches.
        let a = Cluster::new(
            1,
            vec![
                Keyword::new("seo services", 100, Competition::Low),
                Keyword::new("seo audit", 90, Competition::Low),
            ],
            ClusterAlgorithm::Hybrid,
        );
        let b = Cluster::new(
            2,
            vec![
                Keyword::new("seo services", 100, Competition::Low),
                Keyword::new("content marketing", 80, Competition::Low),
            ],
            ClusterAlgorithm::Hybrid,
        );
        let mut a = a;
        let mut b = b;
        a.pillar_topic = "seo".to_string();
        b.pillar_topic = "marketing".to_string();

        let unique = ensure_unique_keywords(vec![a, b], 1);
        let owner = unique
            .iter()
            .find(|c| c.contains_keyword("seo services"))
            .unwrap();
        assert_eq!(owner.id, 1);
        assert_unique(&unique);
    }
}
