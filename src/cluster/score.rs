//! Cluster value scoring and ranking

use crate::types::Cluster;

/// Compute the 0-100 value score for one cluster from its keywords and
/// relevance. Pure: the same membership and relevance always produce the
/// same score.
pub fn cluster_value_score(cluster: &Cluster) -> f64 {
    let count = cluster.keywords.len();
    if count == 0 {
        return 0.0;
    }

    let total_volume = cluster.total_search_volume as f64;
    let avg_volume = cluster.avg_search_volume;
    let avg_competition_value =
        cluster.keywords.iter().map(|k| k.competition.as_value()).sum::<f64>() / count as f64;

    let total_volume_score = ((total_volume + 1.0).log10() * 20.0).min(40.0);
    let avg_volume_score = ((avg_volume + 1.0).ln() * 10.0).min(25.0);
    let competition_score =
        ((1.0 - ((avg_competition_value - 1.0) / 2.0).clamp(0.0, 1.0)) * 20.0).clamp(0.0, 20.0);
    let size_score = ((1.0 + count as f64).ln() * 4.0).min(10.0);
    let relevance_component = cluster.relevance_score * 25.0;

    let total = total_volume_score
        + avg_volume_score
        + competition_score
        + size_score
        + relevance_component;
    total.clamp(0.0, 100.0).round()
}

/// Score every cluster, then sort by value, relevance, total volume and
/// size (all descending) and assign ranks 1..K.
pub fn sort_and_rank_clusters(mut clusters: Vec<Cluster>) -> Vec<Cluster> {
    for cluster in clusters.iter_mut() {
        cluster.cluster_value_score = cluster_value_score(cluster);
    }

    clusters.sort_by(|a, b| {
        b.cluster_value_score
            .partial_cmp(&a.cluster_value_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.relevance_score
                    .partial_cmp(&a.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(b.total_search_volume.cmp(&a.total_search_volume))
            .then(b.keywords.len().cmp(&a.keywords.len()))
    });

    for (index, cluster) in clusters.iter_mut().enumerate() {
        cluster.rank = (index + 1) as u32;
    }
    clusters
}
