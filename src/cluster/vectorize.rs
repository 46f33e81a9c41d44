//! Keyword feature vectors
//!
//! Each keyword becomes a TF-IDF vector over the stemmed tokens of the
//! whole keyword set, with four dense features appended: damped volume,
//! competition weight, word count, and damped CPC.

use crate::text::{stem_tokens, TfIdf};
use crate::types::Keyword;

/// Build one feature vector per keyword. All vectors share the same layout:
/// the sorted vocabulary first, then the dense features.
pub fn build_feature_vectors(keywords: &[Keyword]) -> Vec<Vec<f64>> {
    let token_docs: Vec<Vec<String>> = keywords.iter().map(|k| stem_tokens(&k.text)).collect();
    let tfidf = TfIdf::from_tokens(token_docs.clone());
    let vocabulary = tfidf.vocabulary();

    let term_index: std::collections::HashMap<&str, usize> = vocabulary
        .iter()
        .enumerate()
        .map(|(i, term)| (term.as_str(), i))
        .collect();

    keywords
        .iter()
        .enumerate()
        .map(|(doc_index, keyword)| {
            let mut vector = vec![0.0; vocabulary.len() + 4];
            for (term, score) in tfidf.list_terms(doc_index) {
                if let Some(&i) = term_index.get(term.as_str()) {
                    vector[i] = score;
                }
            }
            let base = vocabulary.len();
            vector[base] = ((keyword.search_volume as f64) + 1.0).ln() / 10.0;
            vector[base + 1] = keyword.competition.as_feature();
            vector[base + 2] = keyword.word_count() as f64 / 5.0;
            vector[base + 3] = (keyword.cpc_low + 1.0).ln() / 5.0;
            vector
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Competition;

    #[test]
    fn test_vector_layout_is_uniform() {
        let keywords = vec![
            Keyword::new("seo services", 1000, Competition::Low),
            Keyword::new("web design", 500, Competition::High),
        ];
        let vectors = build_feature_vectors(&keywords);
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), vectors[1].len());
    }

    #[test]
    fn test_dense_features() {
        let keywords = vec![Keyword::new("seo", 0, Competition::Low).with_cpc(0.0, 0.0)];
        let vectors = build_feature_vectors(&keywords);
        let n = vectors[0].len();
        // volume 0 -> ln(1)/10 = 0; competition low -> 1; one word -> 0.2; cpc 0 -> 0
        assert!((vectors[0][n - 4] - 0.0).abs() < 1e-9);
        assert!((vectors[0][n - 3] - 1.0).abs() < 1e-9);
        assert!((vectors[0][n - 2] - 0.2).abs() < 1e-9);
        assert!((vectors[0][n - 1] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_shared_tokens_share_dimensions() {
        let keywords = vec![
            Keyword::new("seo services", 100, Competition::Low),
            Keyword::new("seo audit", 100, Competition::Low),
            Keyword::new("car insurance", 100, Competition::Low),
        ];
        let vectors = build_feature_vectors(&keywords);
        // "seo" occupies the same dimension in both seo keywords.
        let overlap_ab: f64 = vectors[0]
            .iter()
            .zip(&vectors[1])
            .map(|(a, b)| a * b)
            .sum();
        let overlap_ac: f64 = vectors[0]
            .iter()
            .zip(&vectors[2])
            .map(|(a, b)| a * b)
            .sum();
        assert!(overlap_ab > overlap_ac);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_feature_vectors(&[]).is_empty());
    }
}
