//! AI enhancement for the keyword pipeline
//!
//! The AI provider is a text-in/text-out collaborator behind
//! [`AiProvider`]; every call here sends a prompt and parses the JSON
//! payload out of the reply. All failures are recoverable: callers convert
//! them to job warnings and the deterministic fallbacks take over.

mod client;
mod prompts;

pub use client::HttpAiClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::types::{Cluster, Keyword, ScrapeResult, SiteContext};
use crate::util::truncate_str;

/// Errors from the AI provider or payload parsing
#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AI API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("AI response carried no parseable JSON payload")]
    BadPayload,
}

/// Text-completion provider. Implementations are swapped by construction;
/// tests use scripted doubles.
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
}

/// A rename suggestion addressed by cluster position.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterRename {
    pub index: usize,
    pub name: String,
}

/// Response of the regroup request: renames plus priority flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegroupSuggestions {
    #[serde(default)]
    pub renames: Vec<ClusterRename>,
    #[serde(default)]
    pub priority_indices: Vec<usize>,
}

/// One keyword-ownership correction from the scrutiny pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordReassignment {
    pub keyword: String,
    pub to_cluster: u32,
}

/// A rename addressed by cluster id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrutinyRename {
    pub cluster_id: u32,
    pub name: String,
}

/// Response of the scrutiny request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrutinyReport {
    #[serde(default)]
    pub reassignments: Vec<KeywordReassignment>,
    /// (from, into) cluster id pairs
    #[serde(default)]
    pub merges: Vec<(u32, u32)>,
    #[serde(default)]
    pub renames: Vec<ScrutinyRename>,
}

/// Response of the per-cluster enhancement request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEnhancement {
    #[serde(default)]
    pub pillar_topic: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content_strategy: String,
}

/// High-level AI operations over the pipeline's data
pub struct AiEnhancer {
    provider: Arc<dyn AiProvider>,
}

impl AiEnhancer {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    /// Ask for up to `max` short seed keywords in the target language.
    pub async fn generate_seed_keywords(
        &self,
        scrape: &ScrapeResult,
        language: &str,
        max: usize,
    ) -> Result<Vec<String>, AiError> {
        let prompt = prompts::seed_keywords(scrape, language, max);
        let response = self.provider.complete(&prompt).await?;
        let seeds: Vec<String> = parse_payload(&response)?;
        debug!("AI seed generation returned {} entries", seeds.len());
        Ok(seeds.into_iter().take(max).collect())
    }

    /// Ask for cluster renames and priority picks.
    pub async fn regroup_suggestions(
        &self,
        clusters: &[Cluster],
        context: &SiteContext,
        all_keywords: &[Keyword],
        language: &str,
    ) -> Result<RegroupSuggestions, AiError> {
        let prompt = prompts::regroup(clusters, context, all_keywords, language);
        let response = self.provider.complete(&prompt).await?;
        parse_payload(&response)
    }

    /// Ask for a keyword-ownership audit: reassignments, merges, renames.
    pub async fn scrutinize(
        &self,
        clusters: &[Cluster],
        keywords: &[Keyword],
        context: &SiteContext,
        language: &str,
    ) -> Result<ScrutinyReport, AiError> {
        let prompt = prompts::scrutiny(clusters, keywords, context, language);
        let response = self.provider.complete(&prompt).await?;
        parse_payload(&response)
    }

    /// Ask for a pillar topic, description and content strategy for one
    /// cluster.
    pub async fn enhance_cluster(
        &self,
        cluster: &Cluster,
        context: &SiteContext,
        language: &str,
    ) -> Result<ClusterEnhancement, AiError> {
        let prompt = prompts::enhance(cluster, context, language);
        let response = self.provider.complete(&prompt).await?;
        parse_payload(&response)
    }
}

/// Fill in a deterministic description and content strategy for a cluster
/// whose AI enhancement is missing or empty.
pub fn fill_narratives(cluster: &mut Cluster, context: &SiteContext) {
    let top: Vec<&str> = cluster
        .keywords
        .iter()
        .take(4)
        .map(|k| k.text.as_str())
        .collect();
    let topic_list = top.join(", ");

    let site_summary = if context.title.is_empty() {
        "the site".to_string()
    } else {
        truncate_str(&context.title, 80)
    };

    if cluster.ai_description.as_deref().unwrap_or("").is_empty() {
        cluster.ai_description = Some(format!(
            "The \"{}\" cluster groups {} keywords with a combined monthly search volume of {}. \
             Leading searches include {}.",
            cluster.pillar_topic,
            cluster.keyword_count(),
            cluster.total_search_volume,
            topic_list,
        ));
    }
    if cluster.ai_content_strategy.as_deref().unwrap_or("").is_empty() {
        cluster.ai_content_strategy = Some(format!(
            "Create a pillar page for \"{}\" on {} and support it with articles targeting {}. \
             Interlink the supporting articles with the pillar page to consolidate topical authority.",
            cluster.pillar_topic, site_summary, topic_list,
        ));
    }
}

/// Pull the JSON payload out of a model reply and deserialize it. Handles
/// fenced code blocks and leading/trailing prose.
fn parse_payload<T: serde::de::DeserializeOwned>(response: &str) -> Result<T, AiError> {
    let payload = extract_json_payload(response).ok_or(AiError::BadPayload)?;
    serde_json::from_str(payload).map_err(|e| {
        debug!("failed to parse AI payload: {}", e);
        AiError::BadPayload
    })
}

/// Locate the JSON value inside a model reply.
fn extract_json_payload(text: &str) -> Option<&str> {
    // Fenced block first: ```json ... ``` or plain ``` ... ```
    if let Some(fence_start) = text.find("```") {
        let after = &text[fence_start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(fence_end) = body.find("```") {
            let inner = body[..fence_end].trim();
            if !inner.is_empty() {
                return Some(inner);
            }
        }
    }

    // Otherwise the outermost bracket pair of either kind.
    let array_start = text.find('[');
    let object_start = text.find('{');
    let (open, close) = match (array_start, object_start) {
        (Some(a), Some(o)) if a < o => (a, text.rfind(']')?),
        (Some(a), None) => (a, text.rfind(']')?),
        (_, Some(o)) => (o, text.rfind('}')?),
        (None, None) => return None,
    };
    if close <= open {
        return None;
    }
    Some(text[open..=close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClusterAlgorithm, Competition};

    #[test]
    fn test_extract_plain_array() {
        let payload = extract_json_payload(r#"["seo services", "web design"]"#).unwrap();
        let parsed: Vec<String> = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_extract_fenced_payload() {
        let text = "Here are the keywords:\n```json\n[\"a\", \"b\"]\n```\nHope that helps!";
        let payload = extract_json_payload(text).unwrap();
        assert_eq!(payload, r#"["a", "b"]"#);
    }

    #[test]
    fn test_extract_object_with_prose() {
        let text = "Sure! {\"renames\": [], \"priorityIndices\": [0, 2]} as requested.";
        let parsed: RegroupSuggestions = parse_payload(text).unwrap();
        assert_eq!(parsed.priority_indices, vec![0, 2]);
    }

    #[test]
    fn test_extract_nothing() {
        assert!(extract_json_payload("no json here at all").is_none());
    }

    #[test]
    fn test_scrutiny_report_shape() {
        let text = r#"{
            "reassignments": [{"keyword": "seo audit", "toCluster": 2}],
            "merges": [[3, 1]],
            "renames": [{"clusterId": 1, "name": "Search Optimization"}]
        }"#;
        let report: ScrutinyReport = parse_payload(text).unwrap();
        assert_eq!(report.reassignments.len(), 1);
        assert_eq!(report.merges, vec![(3, 1)]);
        assert_eq!(report.renames[0].cluster_id, 1);
    }

    #[test]
    fn test_fill_narratives() {
        let mut cluster = Cluster::new(
            1,
            vec![
                Keyword::new("seo services", 1000, Competition::Low),
                Keyword::new("seo audit", 900, Competition::Low),
            ],
            ClusterAlgorithm::Hybrid,
        );
        cluster.pillar_topic = "seo services".to_string();
        let context = SiteContext {
            title: "Acme Digital Agency".to_string(),
            ..Default::default()
        };
        fill_narratives(&mut cluster, &context);

        let description = cluster.ai_description.unwrap();
        assert!(description.contains("seo services"));
        assert!(description.contains("1900"));
        let strategy = cluster.ai_content_strategy.unwrap();
        assert!(strategy.contains("Acme Digital Agency"));
    }

    #[test]
    fn test_fill_narratives_keeps_existing() {
        let mut cluster = Cluster::new(
            1,
            vec![Keyword::new("seo", 100, Competition::Low)],
            ClusterAlgorithm::Hybrid,
        );
        cluster.ai_description = Some("existing description".to_string());
        fill_narratives(&mut cluster, &SiteContext::default());
        assert_eq!(cluster.ai_description.as_deref(), Some("existing description"));
        // The empty strategy is still filled in.
        assert!(cluster.ai_content_strategy.is_some());
    }
}
