//! Prompt builders for the AI operations
//!
//! Every prompt pins down the exact JSON shape the reply must carry; the
//! payload parser on the other side is forgiving about fences and prose.

use std::fmt::Write;

use crate::types::{Cluster, Keyword, ScrapeResult, SiteContext};
use crate::util::truncate_str;

/// Pages summarized into a seed prompt.
const SEED_PROMPT_PAGES: usize = 5;

/// Keywords listed per cluster in audit prompts.
const PROMPT_KEYWORDS_PER_CLUSTER: usize = 10;

fn context_summary(context: &SiteContext) -> String {
    let mut summary = String::new();
    if !context.url.is_empty() {
        let _ = writeln!(summary, "URL: {}", context.url);
    }
    if !context.title.is_empty() {
        let _ = writeln!(summary, "Title: {}", truncate_str(&context.title, 120));
    }
    if !context.description.is_empty() {
        let _ = writeln!(summary, "Description: {}", truncate_str(&context.description, 200));
    }
    if !context.focus_terms.is_empty() {
        let joined = context.focus_terms.join(", ");
        let _ = writeln!(summary, "Focus: {}", truncate_str(&joined, 300));
    }
    summary
}

fn cluster_listing(clusters: &[Cluster]) -> String {
    let mut listing = String::new();
    for cluster in clusters {
        let keywords = cluster
            .keywords
            .iter()
            .take(PROMPT_KEYWORDS_PER_CLUSTER)
            .map(|k| k.text.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            listing,
            "- id {} \"{}\" ({} keywords, {} total volume): {}",
            cluster.id,
            cluster.pillar_topic,
            cluster.keyword_count(),
            cluster.total_search_volume,
            keywords
        );
    }
    listing
}

/// Prompt for seed keyword generation from scraped content.
pub fn seed_keywords(scrape: &ScrapeResult, language: &str, max: usize) -> String {
    let mut pages = String::new();
    for page in scrape.pages.iter().take(SEED_PROMPT_PAGES) {
        let _ = writeln!(pages, "Page: {}", truncate_str(&page.title, 120));
        if !page.meta_description.is_empty() {
            let _ = writeln!(pages, "  {}", truncate_str(&page.meta_description, 200));
        }
        let headings = page.all_headings().cloned().collect::<Vec<_>>().join("; ");
        if !headings.is_empty() {
            let _ = writeln!(pages, "  Headings: {}", truncate_str(&headings, 400));
        }
    }

    format!(
        "You are a keyword researcher. Based on this website content, produce up to {max} \
         marketing-focused seed keywords in language \"{language}\". Each keyword must be 1-3 \
         words, ordered by relevance to the site's business.\n\n{pages}\n\
         Reply with ONLY a JSON array of strings, nothing else."
    )
}

/// Prompt for cluster renames and priority picks.
pub fn regroup(
    clusters: &[Cluster],
    context: &SiteContext,
    all_keywords: &[Keyword],
    language: &str,
) -> String {
    let keyword_sample = all_keywords
        .iter()
        .take(60)
        .map(|k| k.text.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are reviewing keyword topic clusters for this website:\n{}\n\
         Clusters (by position, starting at 0):\n{}\n\
         All keywords: {}\n\n\
         In language \"{language}\": suggest better pillar names where a cluster name is vague, \
         and pick the clusters this business should prioritize.\n\
         Reply with ONLY JSON: {{\"renames\": [{{\"index\": 0, \"name\": \"...\"}}], \
         \"priorityIndices\": [0, 2]}}.",
        context_summary(context),
        cluster_listing(clusters),
        truncate_str(&keyword_sample, 1500),
    )
}

/// Prompt for the keyword-ownership audit.
pub fn scrutiny(
    clusters: &[Cluster],
    keywords: &[Keyword],
    context: &SiteContext,
    language: &str,
) -> String {
    format!(
        "Audit these keyword clusters for this website:\n{}\n\
         Clusters:\n{}\n\
         Total keywords: {}.\n\n\
         In language \"{language}\": flag keywords sitting in the wrong cluster, clusters that \
         should merge, and clusters needing a clearer name.\n\
         Reply with ONLY JSON: {{\"reassignments\": [{{\"keyword\": \"...\", \"toCluster\": 2}}], \
         \"merges\": [[fromId, intoId]], \"renames\": [{{\"clusterId\": 1, \"name\": \"...\"}}]}}.",
        context_summary(context),
        cluster_listing(clusters),
        keywords.len(),
    )
}

/// Prompt for one cluster's pillar topic, description and content strategy.
pub fn enhance(cluster: &Cluster, context: &SiteContext, language: &str) -> String {
    let keywords = cluster
        .keywords
        .iter()
        .take(PROMPT_KEYWORDS_PER_CLUSTER)
        .map(|k| format!("{} ({}/mo)", k.text, k.search_volume))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Website:\n{}\n\
         Topic cluster \"{}\" with keywords: {}.\n\n\
         In language \"{language}\": provide a concise pillar topic (may keep the current one), \
         a 2-3 sentence description of the cluster's search intent, and a concrete content \
         strategy for ranking on these keywords.\n\
         Reply with ONLY JSON: {{\"pillarTopic\": \"...\", \"description\": \"...\", \
         \"contentStrategy\": \"...\"}}.",
        context_summary(context),
        cluster.pillar_topic,
        keywords,
    )
}
