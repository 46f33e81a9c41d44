//! Site-context relevance scoring and filtering
//!
//! Keywords are scored against the stemmed token set of the site context;
//! off-topic keywords are dropped and cluster relevance is a volume-weighted
//! blend of its keywords' scores.

use std::collections::HashSet;

use tracing::debug;

use crate::types::{Cluster, Keyword, SiteContext};
use crate::text::{is_stop_word, stem_tokens, tokenize};

use super::refine::select_pillar;

/// Keywords scoring at or below this are considered off-topic.
const DROP_THRESHOLD: f64 = 0.01;

/// Relevance floor when the raw keyword appears verbatim in the context.
const SUBSTRING_FLOOR: f64 = 0.9;

/// Relevance floor for short keywords with strong token overlap.
const SHORT_MATCH_FLOOR: f64 = 0.75;

/// Token set and normalized text of a site context.
pub struct ContextIndex {
    tokens: HashSet<String>,
    normalized_text: String,
}

impl ContextIndex {
    /// Build the index; returns None when the context has no usable tokens.
    pub fn build(context: &SiteContext) -> Option<Self> {
        let mut parts: Vec<&str> = vec![&context.url, &context.title, &context.description];
        parts.extend(context.page_titles.iter().map(|s| s.as_str()));
        parts.extend(context.meta_descriptions.iter().map(|s| s.as_str()));
        parts.extend(context.focus_terms.iter().map(|s| s.as_str()));
        let joined = parts.join(" ");

        let tokens: HashSet<String> = tokenize(&joined)
            .iter()
            .filter(|t| !is_stop_word(t))
            .map(|t| crate::text::stem(t))
            .collect();
        if tokens.is_empty() {
            return None;
        }

        let normalized_text = joined.to_lowercase();
        Some(Self {
            tokens,
            normalized_text,
        })
    }

    /// Relevance of one keyword against the context, in [0, 1].
    pub fn keyword_relevance(&self, keyword: &Keyword) -> f64 {
        let keyword_tokens: HashSet<String> = stem_tokens(&keyword.text)
            .into_iter()
            .filter(|t| !is_stop_word(t))
            .collect();
        if keyword_tokens.is_empty() {
            return 0.0;
        }

        let matched = keyword_tokens.intersection(&self.tokens).count() as f64;
        let match_ratio = matched / keyword_tokens.len() as f64;
        let union = keyword_tokens.union(&self.tokens).count() as f64;
        let jaccard = if union > 0.0 { matched / union } else { 0.0 };

        let mut score = (0.7 * match_ratio + 0.3 * jaccard).min(1.0);

        if self.normalized_text.contains(&keyword.canonical()) {
            score = score.max(SUBSTRING_FLOOR);
        }
        if match_ratio >= 0.6 && keyword_tokens.len() <= 3 {
            score = score.max(SHORT_MATCH_FLOOR);
        }
        score
    }

    /// Whether a keyword survives the relevance filter. Keywords whose
    /// token set is empty after stop-word stripping are kept; there is
    /// nothing to judge them by.
    pub fn keyword_survives(&self, keyword: &Keyword) -> bool {
        let has_tokens = stem_tokens(&keyword.text).iter().any(|t| !is_stop_word(t));
        if !has_tokens {
            return true;
        }
        self.keyword_relevance(keyword) > DROP_THRESHOLD
    }
}

/// Score every cluster against the context, dropping off-topic keywords and
/// clusters that shrink below the minimum size. Without a usable context,
/// all clusters get a neutral relevance of 0.5 and nothing is dropped.
pub fn apply_relevance_scores(
    mut clusters: Vec<Cluster>,
    context: Option<&SiteContext>,
    min_cluster_size: usize,
) -> Vec<Cluster> {
    let index = context.filter(|c| !c.is_empty()).and_then(ContextIndex::build);
    let Some(index) = index else {
        for cluster in clusters.iter_mut() {
            cluster.relevance_score = 0.5;
        }
        return clusters;
    };

    let mut result = Vec::with_capacity(clusters.len());
    for mut cluster in clusters {
        let before = cluster.keywords.len();
        cluster.keywords.retain(|k| index.keyword_survives(k));
        if cluster.keywords.len() < before {
            debug!(
                "cluster {}: dropped {} off-topic keywords",
                cluster.id,
                before - cluster.keywords.len()
            );
        }
        if cluster.keywords.len() < min_cluster_size.min(before) || cluster.keywords.is_empty() {
            continue;
        }
        cluster.recompute_metrics();
        select_pillar(&mut cluster);
        cluster.relevance_score = cluster_relevance(&cluster, &index);
        result.push(cluster);
    }
    result
}

/// Cluster relevance: volume-weighted average of keyword relevance blended
/// with the best keyword's score. Weights are max(1, log10(volume + 10)).
fn cluster_relevance(cluster: &Cluster, index: &ContextIndex) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut best: f64 = 0.0;
    for keyword in &cluster.keywords {
        let relevance = index.keyword_relevance(keyword);
        let weight = ((keyword.search_volume as f64) + 10.0).log10().max(1.0);
        weighted_sum += relevance * weight;
        weight_total += weight;
        best = best.max(relevance);
    }
    if weight_total == 0.0 {
        return 0.0;
    }
    (0.7 * (weighted_sum / weight_total) + 0.3 * best).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClusterAlgorithm, Competition};

    fn dentist_context() -> SiteContext {
        SiteContext {
            url: "https://example.com/dentistry".to_string(),
            title: "Family Dentistry in Zurich".to_string(),
            description: "Gentle dental care, cleaning and implants".to_string(),
            page_titles: vec!["Dental Cleaning".to_string()],
            meta_descriptions: Vec::new(),
            focus_terms: vec!["Dental Implants".to_string()],
        }
    }

    fn keyword(text: &str, volume: u64) -> Keyword {
        Keyword::new(text, volume, Competition::Medium)
    }

    #[test]
    fn test_on_topic_scores_high() {
        let index = ContextIndex::build(&dentist_context()).unwrap();
        let relevance = index.keyword_relevance(&keyword("dental cleaning", 1000));
        assert!(relevance >= 0.75, "got {}", relevance);
    }

    #[test]
    fn test_off_topic_scores_zero() {
        let index = ContextIndex::build(&dentist_context()).unwrap();
        let relevance = index.keyword_relevance(&keyword("car insurance", 1000));
        assert!(relevance <= DROP_THRESHOLD, "got {}", relevance);
        assert!(!index.keyword_survives(&keyword("car insurance", 1000)));
    }

    #[test]
    fn test_substring_floor() {
        let index = ContextIndex::build(&dentist_context()).unwrap();
        // "dental cleaning" appears verbatim in the context text.
        let relevance = index.keyword_relevance(&keyword("dental cleaning", 1000));
        assert!(relevance >= 0.9);
    }

    #[test]
    fn test_filter_drops_cluster_of_irrelevant_keywords() {
        let clusters = vec![
            Cluster::new(
                1,
                vec![
                    keyword("dental cleaning", 1000),
                    keyword("dental implants", 900),
                    keyword("dentistry zurich", 800),
                ],
                ClusterAlgorithm::Hybrid,
            ),
            Cluster::new(
                2,
                vec![
                    keyword("car insurance", 1000),
                    keyword("cheap car insurance", 900),
                    keyword("car insurance quotes", 800),
                ],
                ClusterAlgorithm::Hybrid,
            ),
        ];
        let filtered = apply_relevance_scores(clusters, Some(&dentist_context()), 3);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
        assert!(filtered[0].relevance_score > 0.5);
    }

    #[test]
    fn test_no_context_neutral_scores() {
        let clusters = vec![Cluster::new(
            1,
            vec![keyword("anything", 100), keyword("at all", 90)],
            ClusterAlgorithm::Hybrid,
        )];
        let scored = apply_relevance_scores(clusters, None, 3);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].relevance_score, 0.5);
        assert_eq!(scored[0].keyword_count(), 2);
    }

    #[test]
    fn test_apply_twice_is_stable() {
        let clusters = vec![Cluster::new(
            1,
            vec![
                keyword("dental cleaning", 1000),
                keyword("dental implants", 900),
                keyword("family dentistry", 800),
            ],
            ClusterAlgorithm::Hybrid,
        )];
        let ctx = dentist_context();
        let once = apply_relevance_scores(clusters, Some(&ctx), 3);
        let scores: Vec<f64> = once.iter().map(|c| c.relevance_score).collect();
        let counts: Vec<usize> = once.iter().map(|c| c.keyword_count()).collect();
        let twice = apply_relevance_scores(once, Some(&ctx), 3);
        let scores2: Vec<f64> = twice.iter().map(|c| c.relevance_score).collect();
        let counts2: Vec<usize> = twice.iter().map(|c| c.keyword_count()).collect();
        assert_eq!(scores, scores2);
        assert_eq!(counts, counts2);
    }
}
