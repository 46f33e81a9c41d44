//! Job result export: CSV and JSON

use crate::types::ResearchData;

/// CSV header, one row per keyword.
const CSV_HEADER: &str = "Cluster ID,Pillar Topic,Keyword,Search Volume,Competition,CPC Low,CPC High,Cluster Value Score,Cluster Total Volume";

/// Render the research data as CSV, one row per keyword.
pub fn to_csv(data: &ResearchData) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for cluster in &data.clusters {
        for keyword in &cluster.keywords {
            let row = [
                cluster.id.to_string(),
                csv_field(&cluster.pillar_topic),
                csv_field(&keyword.text),
                keyword.search_volume.to_string(),
                keyword.competition.to_string(),
                format!("{:.2}", keyword.cpc_low),
                format!("{:.2}", keyword.cpc_high),
                format!("{:.2}", cluster.cluster_value_score),
                cluster.total_search_volume.to_string(),
            ];
            out.push_str(&row.join(","));
            out.push('\n');
        }
    }
    out
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render the research data as pretty JSON.
pub fn to_json(data: &ResearchData) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}
