//! Cluster refinement: coherence splits, merges, pillar selection, and
//! keyword-uniqueness enforcement

use tracing::debug;

use crate::text::similarity;
use crate::types::{Cluster, Keyword};

use super::kmeans::KMeans;
use super::vectorize::build_feature_vectors;

/// Clusters less coherent than this (and big enough) get split.
const COHERENCE_THRESHOLD: f64 = 0.3;

/// Only clusters larger than this are considered for a coherence split.
const COHERENCE_SPLIT_MIN_SIZE: usize = 10;

/// Pairwise cluster similarity above which two clusters merge.
const MERGE_THRESHOLD: f64 = 0.6;

/// Clusters larger than this are always split.
const OVERSIZE_THRESHOLD: usize = 30;

/// Keywords sampled for the coherence estimate.
const COHERENCE_SAMPLE: usize = 10;

/// Keywords sampled per cluster for the merge similarity.
const MERGE_SAMPLE: usize = 5;

/// Average pairwise similarity over the cluster's first keywords.
pub fn coherence(cluster: &Cluster) -> f64 {
    let sample: Vec<&Keyword> = cluster.keywords.iter().take(COHERENCE_SAMPLE).collect();
    if sample.len() < 2 {
        return 1.0;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..sample.len() {
        for j in (i + 1)..sample.len() {
            total += similarity(&sample[i].text, &sample[j].text);
            pairs += 1;
        }
    }
    total / pairs as f64
}

/// Pick the pillar topic: the keyword maximizing damped volume times a
/// phrase-length multiplier, plus credit for being contained in other
/// keywords of the cluster.
pub fn select_pillar(cluster: &mut Cluster) {
    let mut best: Option<(usize, f64)> = None;
    for (i, keyword) in cluster.keywords.iter().enumerate() {
        let length_multiplier = match keyword.word_count() {
            1 => 0.8,
            2 | 3 => 1.2,
            4 => 1.0,
            _ => 0.7,
        };
        let canonical = keyword.canonical();
        let containment = cluster
            .keywords
            .iter()
            .enumerate()
            .filter(|(j, other)| *j != i && other.canonical().contains(&canonical))
            .count() as f64;
        let score =
            ((keyword.search_volume as f64) + 1.0).ln() * length_multiplier + 0.5 * containment;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    if let Some((i, _)) = best {
        cluster.pillar_topic = cluster.keywords[i].text.clone();
    } else {
        cluster.pillar_topic.clear();
    }
}

/// Re-run k-means inside one cluster. Returns the sub-groups, or None when
/// the cluster is too small to split or a sub-cluster would fall below the
/// minimum size (in which case the original cluster should be kept).
pub fn split_cluster(cluster: &Cluster, min_cluster_size: usize) -> Option<Vec<Vec<Keyword>>> {
    let size = cluster.keywords.len();
    let k = (size / 5).min(3);
    if k < 2 {
        return None;
    }

    let vectors = build_feature_vectors(&cluster.keywords);
    let assignments = KMeans::new(k).fit(&vectors);

    let mut groups: Vec<Vec<Keyword>> = vec![Vec::new(); k];
    for (index, &assignment) in assignments.iter().enumerate() {
        groups[assignment].push(cluster.keywords[index].clone());
    }
    groups.retain(|g| !g.is_empty());

    if groups.len() < 2 || groups.iter().any(|g| g.len() < min_cluster_size) {
        return None;
    }
    Some(groups)
}

/// Split incoherent large clusters into tighter sub-clusters.
pub fn refine_with_semantics(
    clusters: Vec<Cluster>,
    min_cluster_size: usize,
    next_id: &mut u32,
) -> Vec<Cluster> {
    let mut refined = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let score = coherence(&cluster);
        if score < COHERENCE_THRESHOLD && cluster.keywords.len() > COHERENCE_SPLIT_MIN_SIZE {
            if let Some(groups) = split_cluster(&cluster, min_cluster_size) {
                debug!(
                    "split cluster {} (coherence {:.2}) into {} sub-clusters",
                    cluster.id,
                    score,
                    groups.len()
                );
                for keywords in groups {
                    let mut sub = Cluster::new(*next_id, keywords, cluster.algorithm);
                    *next_id += 1;
                    select_pillar(&mut sub);
                    refined.push(sub);
                }
                continue;
            }
        }
        refined.push(cluster);
    }
    refined
}

/// Similarity between two clusters: pillar similarity blended with the
/// average similarity over their top keywords.
pub fn cluster_similarity(a: &Cluster, b: &Cluster) -> f64 {
    let pillar_sim = similarity(&a.pillar_topic, &b.pillar_topic);

    let top_a: Vec<&Keyword> = a.keywords.iter().take(MERGE_SAMPLE).collect();
    let top_b: Vec<&Keyword> = b.keywords.iter().take(MERGE_SAMPLE).collect();
    let mut total = 0.0;
    let mut pairs = 0usize;
    for ka in &top_a {
        for kb in &top_b {
            total += similarity(&ka.text, &kb.text);
            pairs += 1;
        }
    }
    let keyword_sim = if pairs > 0 { total / pairs as f64 } else { 0.0 };

    0.4 * pillar_sim + 0.6 * keyword_sim
}

/// Merge cluster pairs whose similarity exceeds the threshold; the earlier
/// cluster absorbs the later one and is recomputed.
pub fn merge_similar_clusters(mut clusters: Vec<Cluster>) -> Vec<Cluster> {
    let mut i = 0;
    while i < clusters.len() {
        let mut j = i + 1;
        while j < clusters.len() {
            if cluster_similarity(&clusters[i], &clusters[j]) > MERGE_THRESHOLD {
                let absorbed = clusters.remove(j);
                debug!("merging cluster {} into cluster {}", absorbed.id, clusters[i].id);
                let target = &mut clusters[i];
                for keyword in absorbed.keywords {
                    if !target.contains_keyword(&keyword.canonical()) {
                        target.keywords.push(keyword);
                    }
                }
                target.recompute_metrics();
                select_pillar(target);
            } else {
                j += 1;
            }
        }
        i += 1;
    }
    clusters
}

/// Split any cluster that grew past the oversize threshold.
pub fn split_mixed_clusters(
    clusters: Vec<Cluster>,
    min_cluster_size: usize,
    next_id: &mut u32,
) -> Vec<Cluster> {
    let mut result = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        if cluster.keywords.len() > OVERSIZE_THRESHOLD {
            if let Some(groups) = split_cluster(&cluster, min_cluster_size) {
                debug!(
                    "split oversized cluster {} ({} keywords) into {} sub-clusters",
                    cluster.id,
                    cluster.keywords.len(),
                    groups.len()
                );
                for keywords in groups {
                    let mut sub = Cluster::new(*next_id, keywords, cluster.algorithm);
                    *next_id += 1;
                    select_pillar(&mut sub);
                    result.push(sub);
                }
                continue;
            }
        }
        result.push(cluster);
    }
    result
}

/// Enforce that every keyword lives in exactly one cluster.
///
/// Duplicates go to the cluster whose pillar they are most similar to
/// (ties break toward the earlier cluster). Clusters that fall below the
/// minimum size dissolve, and their keywords are attached to the best
/// remaining cluster that does not already contain them.
pub fn ensure_unique_keywords(mut clusters: Vec<Cluster>, min_cluster_size: usize) -> Vec<Cluster> {
    use std::collections::HashMap;

    // canonical text -> positions (cluster index, keyword index)
    let mut occurrences: HashMap<String, Vec<usize>> = HashMap::new();
    for (cluster_index, cluster) in clusters.iter().enumerate() {
        for keyword in &cluster.keywords {
            let entry = occurrences.entry(keyword.canonical()).or_default();
            if !entry.contains(&cluster_index) {
                entry.push(cluster_index);
            }
        }
    }

    let mut touched = vec![false; clusters.len()];
    for (canonical, cluster_indices) in occurrences {
        if cluster_indices.len() < 2 {
            continue;
        }
        let mut best_index = cluster_indices[0];
        let mut best_sim = f64::MIN;
        for &cluster_index in &cluster_indices {
            let sim = similarity(&canonical, &clusters[cluster_index].pillar_topic);
            if sim > best_sim {
                best_sim = sim;
                best_index = cluster_index;
            }
        }
        for &cluster_index in &cluster_indices {
            if cluster_index != best_index {
                clusters[cluster_index]
                    .keywords
                    .retain(|k| k.canonical() != canonical);
                touched[cluster_index] = true;
            }
        }
    }

    for (index, cluster) in clusters.iter_mut().enumerate() {
        if touched[index] {
            cluster.recompute_metrics();
            select_pillar(cluster);
        }
    }

    // Dissolve undersized clusters and re-home their keywords.
    let mut orphans: Vec<Keyword> = Vec::new();
    clusters.retain(|cluster| {
        if cluster.keywords.len() >= min_cluster_size {
            true
        } else {
            orphans.extend(cluster.keywords.iter().cloned());
            false
        }
    });

    let mut rehomed = false;
    for keyword in orphans {
        let canonical = keyword.canonical();
        let mut best: Option<(usize, f64)> = None;
        for (cluster_index, cluster) in clusters.iter().enumerate() {
            if cluster.contains_keyword(&canonical) {
                continue;
            }
            let sim = similarity(&keyword.text, &cluster.pillar_topic);
            if best.map_or(true, |(_, s)| sim > s) {
                best = Some((cluster_index, sim));
            }
        }
        if let Some((cluster_index, _)) = best {
            clusters[cluster_index].keywords.push(keyword);
            rehomed = true;
        }
    }
    if rehomed {
        for cluster in clusters.iter_mut() {
            cluster.recompute_metrics();
            select_pillar(cluster);
        }
    }

    clusters
}
