//! Text summary builder for CLI output.
//!
//! Formats human-readable lines for text mode and the utility flags.

use crate::engine::{ExploreResult, HealthReport};
use crate::model::{PathResult, SearchQuery};
use crate::progress;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Numbered path plus search statistics.
pub(crate) fn build_text_summary(query: &SearchQuery, result: &PathResult) -> TextSummary {
    let mut lines = Vec::with_capacity(result.path.len() + 4);
    lines.push(format!("Path: {query} ({} clicks)", result.hops()));
    let width = result.path.len().to_string().len();
    for (i, title) in result.path.iter().enumerate() {
        lines.push(format!("  {:>width$}. {title}", i + 1));
    }
    lines.push(format!(
        "Search time: {}",
        progress::format_elapsed(result.search_time_seconds)
    ));
    lines.push(format!("Nodes explored: {}", result.nodes_explored));
    TextSummary { lines }
}

pub(crate) fn build_explore_summary(explore: &ExploreResult) -> TextSummary {
    let mut lines = vec![format!(
        "{}: showing {} of {} links",
        explore.start_page,
        explore.edges.len(),
        explore.total_links
    )];
    for (_, target) in &explore.edges {
        lines.push(format!("  → {target}"));
    }
    TextSummary { lines }
}

pub(crate) fn build_health_summary(health: &HealthReport) -> TextSummary {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| progress::PLACEHOLDER.into());
    let lines = vec![
        format!("Status: {}", health.status),
        format!("Redis: {}", field(&health.redis_status)),
        format!("Cache: {}", field(&health.cache_status)),
        format!("Wikipedia API: {}", field(&health.wikipedia_api_status)),
        format!("Checked: {}", field(&health.timestamp)),
    ];
    TextSummary { lines }
}
