//! Text primitives: tokenization, stemming, TF-IDF, keyword similarity
//!
//! Everything here is pure and deterministic. Keyword-granularity similarity
//! does not need an external NLP stack; suffix stemming plus token overlap
//! is enough to group "seo services" with "seo optimization".

mod similarity;
mod tfidf;
mod tokenize;

pub use similarity::similarity;
pub use tfidf::TfIdf;
pub use tokenize::{is_stop_word, stem, stem_tokens, tokenize, STOP_WORDS};
