//! Force-directed layout of a found path.
//!
//! The model is built once per path ([`build_graph`]); [`Simulation`] owns it
//! and moves the nodes. Units are virtual pixels; the TUI maps them to cells.

mod forces;
mod simulation;

pub use simulation::{PointerKind, PointerResponse, Simulation, SimulationParams};

use anyhow::{anyhow, Context, Result};

/// Horizontal space taken away from the container width.
pub const CANVAS_INSET: f64 = 40.0;
/// Estimated label width per character.
pub const CHAR_WIDTH_PX: f64 = 7.0;

const MIN_CANVAS_HEIGHT: f64 = 400.0;
const MAX_CANVAS_HEIGHT: f64 = 600.0;
const HEIGHT_PER_NODE: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Start,
    Intermediate,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub title: String,
    pub role: NodeRole,
    pub label_width: f64,
    /// Possibly truncated label, refreshed every tick.
    pub display_label: String,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Set while the node is held by a pointer.
    pub pinned: Option<Point>,
}

impl GraphNode {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Radius used for collisions and hit testing.
    pub fn label_radius(&self) -> f64 {
        self.label_width / 2.0 + 10.0
    }
}

/// Directed edge between consecutive path entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    pub source: usize,
    pub target: usize,
}

pub fn label_width(title: &str) -> f64 {
    title.chars().count() as f64 * CHAR_WIDTH_PX
}

/// Nodes (unplaced) and edges for a path of titles.
pub fn build_graph(path: &[String]) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let last = path.len().saturating_sub(1);
    let nodes = path
        .iter()
        .enumerate()
        .map(|(i, title)| GraphNode {
            title: title.clone(),
            role: if i == 0 {
                NodeRole::Start
            } else if i == last {
                NodeRole::End
            } else {
                NodeRole::Intermediate
            },
            label_width: label_width(title),
            display_label: title.clone(),
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            pinned: None,
        })
        .collect();
    let edges = (1..path.len())
        .map(|i| GraphEdge {
            source: i - 1,
            target: i,
        })
        .collect();
    (nodes, edges)
}

/// Canvas width and height for a container of the given width.
pub fn canvas_size(container_width: f64, node_count: usize, padding: f64) -> (f64, f64) {
    let width = (container_width - CANVAS_INSET).max(padding * 2.0);
    let height = (HEIGHT_PER_NODE * node_count as f64).clamp(MIN_CANVAS_HEIGHT, MAX_CANVAS_HEIGHT);
    (width, height)
}

/// Link target separation: wide enough for the longest label.
pub fn link_distance(nodes: &[GraphNode]) -> f64 {
    let widest = nodes.iter().map(|n| n.label_width).fold(0.0, f64::max);
    (widest + 30.0).max(80.0)
}

/// Label text for the given local spacing.
pub fn truncate_label(title: &str, spacing: f64) -> String {
    let max_chars = ((spacing / 8.0).floor().max(0.0) as usize).max(8);
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let mut out: String = title.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// Wikipedia article URL for a title (`Albert Einstein` → `.../Albert_Einstein`).
pub fn page_url(wiki_base_url: &str, title: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(wiki_base_url)
        .with_context(|| format!("invalid wiki base URL {wiki_base_url}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("wiki base URL cannot take a path: {wiki_base_url}"))?
        .pop_if_empty()
        .push(&title.trim().replace(' ', "_"));
    Ok(url)
}
