//! Tokenization, light suffix stemming, and the stop-word set

/// Generic English and site-navigation terms dropped during relevance
/// scoring. Includes the stems the stemmer produces for them.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "of", "to", "in", "on", "at", "by", "for", "with",
    "from", "as", "is", "are", "was", "were", "be", "been", "it", "its", "this", "that", "these",
    "those", "you", "your", "we", "our", "us", "they", "their", "will", "can", "all", "more",
    "most", "other", "some", "such", "not", "only", "own", "same", "so", "than", "too", "very",
    "how", "what", "when", "where", "which", "who", "why", "about", "into", "over", "under",
    "home", "page", "site", "website", "menu", "contact", "click", "here", "learn", "read",
    "view", "see", "get", "new",
];

/// Whether a token (or its stem) is in the stop-word set.
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token) || STOP_WORDS.contains(&stem(token).as_str())
}

/// Split text into lowercase tokens: maximal runs of Unicode letters and
/// digits. Empty input yields no tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                current.push(lc);
            }
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Tokenize and stem in one pass.
pub fn stem_tokens(text: &str) -> Vec<String> {
    tokenize(text).iter().map(|t| stem(t)).collect()
}

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u', 'y'];

fn has_vowel(s: &str) -> bool {
    s.chars().any(|c| VOWELS.contains(&c))
}

/// Collapse a trailing double consonant ("runn" -> "run").
fn undouble(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() >= 2 {
        let last = chars[chars.len() - 1];
        let prev = chars[chars.len() - 2];
        if last == prev && !VOWELS.contains(&last) {
            return chars[..chars.len() - 1].iter().collect();
        }
    }
    s.to_string()
}

/// Light suffix stemmer. At most one rule applies per token; tokens shorter
/// than four characters are returned unchanged.
///
/// Rules, in order: -ies -> -y; -sses/-shes/-ches/-xes -> strip 2;
/// vowel+ed / vowel+ing -> strip suffix, then collapse a trailing double
/// consonant; trailing -s -> strip.
pub fn stem(token: &str) -> String {
    if token.chars().count() < 4 {
        return token.to_string();
    }

    if let Some(base) = token.strip_suffix("ies") {
        return format!("{}y", base);
    }

    for suffix in ["sses", "shes", "ches", "xes"] {
        if token.ends_with(suffix) {
            return token[..token.len() - 2].to_string();
        }
    }

    if let Some(base) = token.strip_suffix("ing") {
        if base.chars().count() >= 2 && has_vowel(base) {
            return undouble(base);
        }
    }
    if let Some(base) = token.strip_suffix("ed") {
        if base.chars().count() >= 2 && has_vowel(base) {
            return undouble(base);
        }
    }

    if let Some(base) = token.strip_suffix('s') {
        if !base.ends_with('s') {
            return base.to_string();
        }
    }

    token.to_string()
}
