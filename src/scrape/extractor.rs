//! Content extraction from HTML
//!
//! Turns a raw page into structured content: title, meta description,
//! deduplicated headings, substantive paragraphs, list items, anchor texts
//! and image alts. Boilerplate subtrees (navigation, footers, cookie
//! banners, ad slots) are excluded before anything is collected.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::types::PageContent;

/// Tag names whose entire subtree is boilerplate.
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "nav", "footer", "header", "aside",
];

/// Class/id markers for boilerplate containers.
const EXCLUDED_MARKERS: &[&str] = &[
    "sidebar",
    "menu",
    "navigation",
    "cookie",
    "popup",
    "modal",
    "advertisement",
    "ads",
    "comments",
];

/// Minimum words for a paragraph to count as substantive.
const MIN_PARAGRAPH_WORDS: usize = 10;

/// Anchor texts beyond this many do not contribute to the word count.
const WORD_COUNT_LINK_CAP: usize = 50;

/// Content extractor with pre-compiled selectors
pub struct PageExtractor {
    title: Selector,
    meta_description: Selector,
    og_description: Selector,
    h1: Selector,
    h2: Selector,
    h3: Selector,
    paragraph: Selector,
    container: Selector,
    list_item: Selector,
    anchor: Selector,
    image: Selector,
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageExtractor {
    pub fn new() -> Self {
        // Static selector strings, parse cannot fail.
        let parse = |s: &str| Selector::parse(s).expect("static selector");
        Self {
            title: parse("title"),
            meta_description: parse("meta[name=\"description\"]"),
            og_description: parse("meta[property=\"og:description\"]"),
            h1: parse("h1"),
            h2: parse("h2"),
            h3: parse("h3"),
            paragraph: parse("p"),
            container: parse("article, section, main"),
            list_item: parse("li"),
            anchor: parse("a[href]"),
            image: parse("img[alt]"),
        }
    }

    /// Extract structured content from a page.
    pub fn extract(&self, html: &str, url: &Url) -> PageContent {
        let document = Html::parse_document(html);

        let title = self.extract_title(&document);
        let meta_description = self.extract_meta_description(&document);

        let h1 = self.extract_headings(&document, &self.h1);
        let h2 = self.extract_headings(&document, &self.h2);
        let h3 = self.extract_headings(&document, &self.h3);

        let paragraphs = self.extract_paragraphs(&document);
        let list_items = self.extract_list_items(&document);
        let links = self.extract_anchor_texts(&document);
        let image_alts = self.extract_image_alts(&document);

        let word_count = count_words(
            &title,
            &meta_description,
            [&h1, &h2, &h3],
            &paragraphs,
            &list_items,
            &links,
            &image_alts,
        );

        PageContent {
            url: url.to_string(),
            title,
            meta_description,
            h1,
            h2,
            h3,
            paragraphs,
            list_items,
            links,
            image_alts,
            word_count,
        }
    }

    fn extract_title(&self, document: &Html) -> String {
        if let Some(el) = document.select(&self.title).next() {
            let text = element_text(&el);
            if !text.is_empty() {
                return text;
            }
        }
        document
            .select(&self.h1)
            .find(|el| !in_excluded_subtree(el))
            .map(|el| element_text(&el))
            .unwrap_or_default()
    }

    fn extract_meta_description(&self, document: &Html) -> String {
        for selector in [&self.meta_description, &self.og_description] {
            if let Some(el) = document.select(selector).next() {
                if let Some(content) = el.value().attr("content") {
                    let trimmed = content.trim();
                    if !trimmed.is_empty() {
                        return trimmed.to_string();
                    }
                }
            }
        }
        String::new()
    }

    /// Headings of one level with order-preserving deduplication by trimmed
    /// text.
    fn extract_headings(&self, document: &Html, selector: &Selector) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for el in document.select(selector) {
            if in_excluded_subtree(&el) {
                continue;
            }
            let text = element_text(&el);
            if !text.is_empty() && !seen.contains(&text) {
                seen.push(text);
            }
        }
        seen
    }

    fn extract_paragraphs(&self, document: &Html) -> Vec<String> {
        let mut paragraphs = Vec::new();
        for el in document.select(&self.paragraph) {
            if in_excluded_subtree(&el) {
                continue;
            }
            let text = element_text(&el);
            if text.split_whitespace().count() >= MIN_PARAGRAPH_WORDS {
                paragraphs.push(text);
            }
        }
        // For containers only the direct text nodes count, otherwise every
        // nested paragraph would be collected twice.
        for el in document.select(&self.container) {
            if in_excluded_subtree(&el) {
                continue;
            }
            let text = direct_text(&el);
            if text.split_whitespace().count() >= MIN_PARAGRAPH_WORDS {
                paragraphs.push(text);
            }
        }
        paragraphs
    }

    fn extract_list_items(&self, document: &Html) -> Vec<String> {
        document
            .select(&self.list_item)
            .filter(|el| !in_excluded_subtree(el))
            .map(|el| element_text(&el))
            .filter(|text| text.len() > 10)
            .collect()
    }

    /// Deduplicated anchor texts; in-page fragment links are skipped.
    fn extract_anchor_texts(&self, document: &Html) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for el in document.select(&self.anchor) {
            if in_excluded_subtree(&el) {
                continue;
            }
            let href = el.value().attr("href").unwrap_or("");
            if href.starts_with('#') {
                continue;
            }
            let text = element_text(&el);
            if text.len() > 3 && !seen.contains(&text) {
                seen.push(text);
            }
        }
        seen
    }

    fn extract_image_alts(&self, document: &Html) -> Vec<String> {
        document
            .select(&self.image)
            .filter(|el| !in_excluded_subtree(el))
            .filter_map(|el| el.value().attr("alt"))
            .map(|alt| alt.trim().to_string())
            .filter(|alt| alt.len() > 3)
            .collect()
    }
}

/// Whether an element sits inside a boilerplate subtree (or is one itself).
fn in_excluded_subtree(el: &ElementRef) -> bool {
    let mut node = Some(**el);
    while let Some(current) = node {
        if let Some(element) = ElementRef::wrap(current) {
            let value = element.value();
            if EXCLUDED_TAGS.contains(&value.name()) {
                return true;
            }
            let id = value.attr("id").unwrap_or("").to_lowercase();
            let class = value.attr("class").unwrap_or("").to_lowercase();
            if EXCLUDED_MARKERS
                .iter()
                .any(|m| id.contains(m) || class.contains(m))
            {
                return true;
            }
        }
        node = current.parent();
    }
    false
}

/// Full visible text of an element, whitespace-collapsed and trimmed.
fn element_text(el: &ElementRef) -> String {
    crate::util::collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Text of the element's direct text-node children only.
fn direct_text(el: &ElementRef) -> String {
    el.children()
        .filter_map(|child| child.value().as_text().map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn count_words(
    title: &str,
    meta_description: &str,
    headings: [&Vec<String>; 3],
    paragraphs: &[String],
    list_items: &[String],
    links: &[String],
    image_alts: &[String],
) -> usize {
    let mut count = title.split_whitespace().count();
    count += meta_description.split_whitespace().count();
    for level in headings {
        count += level.iter().map(|h| h.split_whitespace().count()).sum::<usize>();
    }
    count += paragraphs.iter().map(|p| p.split_whitespace().count()).sum::<usize>();
    count += list_items.iter().map(|i| i.split_whitespace().count()).sum::<usize>();
    count += links
        .iter()
        .take(WORD_COUNT_LINK_CAP)
        .map(|l| l.split_whitespace().count())
        .sum::<usize>();
    count += image_alts.iter().map(|a| a.split_whitespace().count()).sum::<usize>();
    count
}

/// Extract and resolve all hyperlinks from a page for crawling.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();
    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if href.starts_with('#') {
                continue;
            }
            if let Ok(url) = base_url.join(href) {
                if (url.scheme() == "http" || url.scheme() == "https")
                    && seen.insert(url.as_str().to_string())
                {
                    urls.push(url);
                }
            }
        }
    }
    urls
}
