// Report generation for analytics results

use crate::analytics::AnalyticsResult;
use crate::crawl::{extract_url_path, render_tree};
use crate::error::Result;
use crate::metrics::SessionMetrics;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    result: &'a AnalyticsResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<&'a SessionMetrics>,
}

pub fn generate_report(
    result: &AnalyticsResult,
    metrics: Option<&SessionMetrics>,
    format: ReportFormat,
) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(result, metrics)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport { result, metrics })?),
    }
}

pub fn save_report(content: &str, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Backtrack edges, busiest first. Ties are ordered by key.
pub fn ranked_backtracks(result: &AnalyticsResult) -> Vec<(&str, usize)> {
    let mut edges: Vec<(&str, usize)> = result.backtracking.iter().collect();
    edges.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    edges
}

fn generate_text_report(result: &AnalyticsResult, metrics: Option<&SessionMetrics>) -> String {
    let mut out = String::new();

    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    out.push_str("  NAVIGATION REPORT\n");
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    if let Some(metrics) = metrics {
        out.push_str("# Sessions:\n");
        out.push_str(&format!("  Total sessions: {}\n", metrics.total_sessions));
        out.push_str(&format!("  Sessions with movement: {}\n", metrics.unique_movements));
        out.push_str(&format!("  Bounce rate: {:.1}%\n", metrics.bounce_rate));
        out.push_str(&format!("  Drop-off rate: {:.1}%\n", metrics.drop_off_rate));
        out.push_str(&format!(
            "  Average time on page: {:.1}s\n\n",
            metrics.average_time_spent
        ));
    }

    out.push_str(&format!("# Weighted map: {}\n", result.web_map.id));
    render_tree(&result.web_map, &mut out, |node| match node.weight {
        Some(weight) => format!("{} ({})", extract_url_path(&node.id), weight),
        None => extract_url_path(&node.id),
    });

    out.push_str("\n# Backtracking:\n");
    let edges = ranked_backtracks(result);
    if edges.is_empty() {
        out.push_str("  No backtracking detected\n");
    }
    for (edge, visitors) in edges {
        let noun = if visitors == 1 { "visitor" } else { "visitors" };
        out.push_str(&format!("  {:>4} {}  {}\n", visitors, noun, edge));
    }

    out
}
