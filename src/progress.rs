//! Projects backend progress payloads into display-safe snapshots.

use crate::engine::TaskProgress;
use crate::model::ProgressSnapshot;

/// Shown wherever a title or node is not known yet.
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthCell {
    Completed,
    Active,
    Pending,
}

/// Stats shown before the first progress payload arrives (and after a clear).
pub fn neutral(max_depth: u32) -> ProgressSnapshot {
    ProgressSnapshot {
        current_depth: 0,
        max_depth,
        nodes_explored: 0,
        queue_size: 0,
        last_node: PLACEHOLDER.to_string(),
        elapsed_seconds: 0.0,
        start_title: PLACEHOLDER.to_string(),
        end_title: PLACEHOLDER.to_string(),
        status_message: None,
    }
}

/// Missing fields default instead of failing; partial payloads are normal
/// while a task is still starting up.
pub fn project(progress: &TaskProgress, max_depth: u32) -> ProgressSnapshot {
    let stats = progress.search_stats.clone().unwrap_or_default();
    ProgressSnapshot {
        current_depth: stats.current_depth.unwrap_or(0),
        max_depth,
        nodes_explored: stats.nodes_explored.unwrap_or(0),
        queue_size: stats.queue_size.unwrap_or(0),
        last_node: non_blank(stats.last_node),
        elapsed_seconds: progress
            .search_time_elapsed
            .filter(|s| s.is_finite() && *s >= 0.0)
            .unwrap_or(0.0),
        start_title: non_blank(progress.start_page.clone()),
        end_title: non_blank(progress.end_page.clone()),
        status_message: progress
            .status
            .clone()
            .filter(|s| !s.trim().is_empty()),
    }
}

fn non_blank(v: Option<String>) -> String {
    v.filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// One cell per depth level; cells below the current depth are done.
pub fn depth_indicator(current_depth: u32, max_depth: u32) -> Vec<DepthCell> {
    (0..max_depth)
        .map(|i| match i.cmp(&current_depth) {
            std::cmp::Ordering::Less => DepthCell::Completed,
            std::cmp::Ordering::Equal => DepthCell::Active,
            std::cmp::Ordering::Greater => DepthCell::Pending,
        })
        .collect()
}

/// Compact indicator for plain-text output, e.g. `##>...`.
pub fn depth_indicator_text(current_depth: u32, max_depth: u32) -> String {
    depth_indicator(current_depth, max_depth)
        .into_iter()
        .map(|c| match c {
            DepthCell::Completed => '#',
            DepthCell::Active => '>',
            DepthCell::Pending => '.',
        })
        .collect()
}

pub fn format_elapsed(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else {
        let whole = seconds as u64;
        format!("{}m {:02}s", whole / 60, whole % 60)
    }
}

/// One status line for headless output.
pub fn summary_line(s: &ProgressSnapshot) -> String {
    let mut line = format!(
        "depth {}/{} [{}] explored {} queue {} last {} ({})",
        s.current_depth.min(s.max_depth),
        s.max_depth,
        depth_indicator_text(s.current_depth, s.max_depth),
        s.nodes_explored,
        s.queue_size,
        s.last_node,
        format_elapsed(s.elapsed_seconds),
    );
    if let Some(msg) = s.status_message.as_deref() {
        line.push_str(" - ");
        line.push_str(msg);
    }
    line
}
