//! TF-IDF scoring over small document sets

use std::collections::HashMap;

use super::tokenize::{stem, tokenize};

/// TF-IDF index over a fixed sequence of documents.
///
/// tf = termCount / docLen, idf = ln((N+1)/(df+1)) + 1. Terms are stemmed
/// tokens; document order is preserved so callers can address documents by
/// index.
pub struct TfIdf {
    docs: Vec<Vec<String>>,
    doc_freq: HashMap<String, usize>,
}

impl TfIdf {
    /// Build the index from raw document texts (tokenized and stemmed here).
    pub fn new<S: AsRef<str>>(documents: &[S]) -> Self {
        let docs: Vec<Vec<String>> = documents
            .iter()
            .map(|d| tokenize(d.as_ref()).iter().map(|t| stem(t)).collect())
            .collect();
        Self::from_tokens(docs)
    }

    /// Build the index from already-tokenized documents.
    pub fn from_tokens(docs: Vec<Vec<String>>) -> Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in &docs {
            let mut seen: Vec<&String> = Vec::new();
            for term in doc {
                if !seen.contains(&term) {
                    seen.push(term);
                    *doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
            }
        }
        Self { docs, doc_freq }
    }

    pub fn num_docs(&self) -> usize {
        self.docs.len()
    }

    /// Inverse document frequency for a term.
    pub fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        ((n + 1.0) / (df + 1.0)).ln() + 1.0
    }

    /// TF-IDF score for a term within one document.
    pub fn score(&self, term: &str, doc_index: usize) -> f64 {
        let Some(doc) = self.docs.get(doc_index) else {
            return 0.0;
        };
        if doc.is_empty() {
            return 0.0;
        }
        let count = doc.iter().filter(|t| t.as_str() == term).count() as f64;
        let tf = count / doc.len() as f64;
        tf * self.idf(term)
    }

    /// All terms of a document with their TF-IDF scores, highest first.
    pub fn list_terms(&self, doc_index: usize) -> Vec<(String, f64)> {
        let Some(doc) = self.docs.get(doc_index) else {
            return Vec::new();
        };
        let mut counts: HashMap<&String, usize> = HashMap::new();
        for term in doc {
            *counts.entry(term).or_insert(0) += 1;
        }
        let len = doc.len() as f64;
        let mut terms: Vec<(String, f64)> = counts
            .into_iter()
            .map(|(term, count)| {
                let tf = count as f64 / len;
                (term.clone(), tf * self.idf(term))
            })
            .collect();
        terms.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        terms
    }

    /// The full vocabulary, sorted, for stable vector layouts.
    pub fn vocabulary(&self) -> Vec<String> {
        let mut terms: Vec<String> = self.doc_freq.keys().cloned().collect();
        terms.sort();
        terms
    }
}
