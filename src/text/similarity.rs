//! Keyword-to-keyword textual similarity

use std::collections::HashSet;

use super::tokenize::{stem, tokenize};

/// Similarity between two short keyword strings, in [0, 1].
///
/// Jaccard overlap on stemmed tokens plus two bonuses: +0.3 when one string
/// contains the other, and a position bonus (+0.2 when both are multi-word
/// and share the last token, else +0.15 when they share the first token).
/// Symmetric, and similarity(x, x) == 1.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_norm = a.trim().to_lowercase();
    let b_norm = b.trim().to_lowercase();

    let a_tokens: Vec<String> = tokenize(&a_norm).iter().map(|t| stem(t)).collect();
    let b_tokens: Vec<String> = tokenize(&b_norm).iter().map(|t| stem(t)).collect();

    if a_tokens.is_empty() || b_tokens.is_empty() {
        return if a_norm == b_norm && !a_norm.is_empty() { 1.0 } else { 0.0 };
    }

    let a_set: HashSet<&String> = a_tokens.iter().collect();
    let b_set: HashSet<&String> = b_tokens.iter().collect();
    let intersection = a_set.intersection(&b_set).count() as f64;
    let union = a_set.union(&b_set).count() as f64;
    let jaccard = if union > 0.0 { intersection / union } else { 0.0 };

    let mut score = jaccard;

    if a_norm.contains(&b_norm) || b_norm.contains(&a_norm) {
        score += 0.3;
    }

    let both_multi_word = a_tokens.len() > 1 && b_tokens.len() > 1;
    if both_multi_word && a_tokens.last() == b_tokens.last() {
        score += 0.2;
    } else if a_tokens.first() == b_tokens.first() {
        score += 0.15;
    }

    score.min(1.0)
}
