use crate::layout::Simulation;
use crate::model::{ControllerPhase, PathResult, ProgressSnapshot, SearchQuery, SessionEvent, TaskId};
use crate::orchestrator::submit_eligibility;
use crate::progress;
use std::time::Instant;

pub const SEARCH_TAB: usize = 0;
pub const HELP_TAB: usize = 1;

/// Width assumed for the graph before the first frame is laid out.
const DEFAULT_GRAPH_WIDTH_PX: f64 = 640.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Start,
    End,
    Graph,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Start => Focus::End,
            Focus::End => Focus::Graph,
            Focus::Graph => Focus::Start,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Start => Focus::Graph,
            Focus::End => Focus::Start,
            Focus::Graph => Focus::End,
        }
    }
}

/// Everything the TUI thread renders. Owned by that thread only.
pub struct UiState {
    pub tab: usize,
    pub focus: Focus,
    pub start_input: String,
    pub end_input: String,
    pub phase: ControllerPhase,
    pub info: String,
    pub error: Option<String>,
    pub task_id: Option<TaskId>,
    pub progress: ProgressSnapshot,
    pub result: Option<PathResult>,
    pub result_restored: bool,
    /// Query whose result is on screen (and persisted).
    pub completed_query: Option<SearchQuery>,
    pub simulation: Option<Simulation>,
    pub selected_node: Option<usize>,
    pub graph_width_px: f64,
    /// Last node clicked and when, for double-click detection.
    pub last_click: Option<(usize, Instant)>,
    pub wiki_base_url: String,
}

impl UiState {
    pub fn new(max_depth: u32, wiki_base_url: impl Into<String>) -> Self {
        Self {
            tab: SEARCH_TAB,
            focus: Focus::Start,
            start_input: String::new(),
            end_input: String::new(),
            phase: ControllerPhase::Idle,
            info: String::new(),
            error: None,
            task_id: None,
            progress: progress::neutral(max_depth),
            result: None,
            result_restored: false,
            completed_query: None,
            simulation: None,
            selected_node: None,
            graph_width_px: DEFAULT_GRAPH_WIDTH_PX,
            last_click: None,
            wiki_base_url: wiki_base_url.into(),
        }
    }

    pub fn submit_enabled(&self) -> bool {
        submit_eligibility(
            self.phase.is_active(),
            &self.start_input,
            &self.end_input,
            self.completed_query.as_ref(),
        )
    }

    /// Why Enter does nothing right now.
    pub fn submit_blocked_reason(&self) -> &'static str {
        if self.phase.is_active() {
            "A search is already running"
        } else if self.start_input.trim().is_empty() || self.end_input.trim().is_empty() {
            "Enter both a start and an end page"
        } else {
            "That path is already shown; change a page to search again"
        }
    }

    pub fn focused_input_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::Start => Some(&mut self.start_input),
            Focus::End => Some(&mut self.end_input),
            Focus::Graph => None,
        }
    }

    pub fn set_graph_width(&mut self, px: f64) {
        if (px - self.graph_width_px).abs() < f64::EPSILON {
            return;
        }
        self.graph_width_px = px;
        if let Some(sim) = self.simulation.as_mut() {
            sim.resize(px);
        }
    }

    pub fn selected_title(&self) -> Option<&str> {
        let i = self.selected_node?;
        self.result.as_ref()?.path.get(i).map(String::as_str)
    }

    pub fn select_next_node(&mut self) {
        let Some(len) = self.result.as_ref().map(|r| r.path.len()).filter(|n| *n > 0) else {
            return;
        };
        self.selected_node = Some(match self.selected_node {
            Some(i) => (i + 1) % len,
            None => 0,
        });
    }

    pub fn select_prev_node(&mut self) {
        let Some(len) = self.result.as_ref().map(|r| r.path.len()).filter(|n| *n > 0) else {
            return;
        };
        self.selected_node = Some(match self.selected_node {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        });
    }

    fn hide_result(&mut self) {
        self.result = None;
        self.result_restored = false;
        self.simulation = None;
        self.selected_node = None;
        self.last_click = None;
        self.completed_query = None;
    }

    pub fn apply_event(&mut self, ev: SessionEvent) {
        match ev {
            SessionEvent::PhaseChanged(phase) => {
                self.phase = phase;
                match phase {
                    ControllerPhase::Submitting => {
                        self.error = None;
                        self.task_id = None;
                        self.hide_result();
                        self.info = "Submitting…".into();
                    }
                    ControllerPhase::Polling => self.info = "Searching…".into(),
                    _ => {}
                }
            }
            SessionEvent::QueryChanged(Some(q)) => {
                self.start_input = q.start_title;
                self.end_input = q.end_title;
            }
            SessionEvent::QueryChanged(None) => {
                self.start_input.clear();
                self.end_input.clear();
            }
            SessionEvent::TaskAccepted { task_id, resumed } => {
                self.info = if resumed {
                    format!("Resumed search {task_id}")
                } else {
                    format!("Search {task_id} accepted")
                };
                self.task_id = Some(task_id);
            }
            SessionEvent::Progress(p) => self.progress = p,
            SessionEvent::Completed {
                query,
                result,
                restored,
            } => {
                self.error = None;
                self.info = format!(
                    "Found {} in {} clicks{}",
                    query,
                    result.hops(),
                    if restored { " (restored)" } else { "" }
                );
                self.simulation = Some(Simulation::new(&result.path, self.graph_width_px));
                self.selected_node = None;
                self.result = Some(*result);
                self.result_restored = restored;
                self.completed_query = Some(query);
            }
            SessionEvent::Failed { message } => {
                self.hide_result();
                self.task_id = None;
                self.error = Some(message);
                self.info.clear();
            }
            SessionEvent::Cleared => {
                self.hide_result();
                self.task_id = None;
                self.error = None;
                self.info = "Cleared".into();
                self.focus = Focus::Start;
            }
            SessionEvent::Info(msg) => self.info = msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(start: &str, end: &str, path: &[&str]) -> SessionEvent {
        SessionEvent::Completed {
            query: SearchQuery::new(start, end).unwrap(),
            result: Box::new(PathResult {
                path: path.iter().map(|s| s.to_string()).collect(),
                search_time_seconds: 0.5,
                nodes_explored: 12,
            }),
            restored: false,
        }
    }

    #[test]
    fn focus_cycles_both_ways() {
        assert_eq!(Focus::Start.next().next().next(), Focus::Start);
        assert_eq!(Focus::Start.prev(), Focus::Graph);
        assert_eq!(Focus::Graph.next(), Focus::Start);
    }

    #[test]
    fn completion_shows_graph_and_blocks_same_query() {
        let mut s = UiState::new(6, "https://en.wikipedia.org/wiki/");
        s.start_input = "A".into();
        s.end_input = "C".into();
        assert!(s.submit_enabled());

        s.apply_event(SessionEvent::PhaseChanged(ControllerPhase::Submitting));
        assert!(!s.submit_enabled());
        assert_eq!(s.submit_blocked_reason(), "A search is already running");

        s.apply_event(completed("A", "C", &["A", "B", "C"]));
        s.apply_event(SessionEvent::PhaseChanged(ControllerPhase::Completed));
        assert_eq!(s.simulation.as_ref().unwrap().nodes().len(), 3);
        assert!(!s.submit_enabled());

        s.end_input = "D".into();
        assert!(s.submit_enabled());
    }

    #[test]
    fn failure_hides_visualization() {
        let mut s = UiState::new(6, "https://en.wikipedia.org/wiki/");
        s.apply_event(completed("A", "C", &["A", "B", "C"]));
        s.selected_node = Some(1);
        s.apply_event(SessionEvent::Failed {
            message: "No path found between the pages".into(),
        });
        assert!(s.simulation.is_none());
        assert!(s.result.is_none());
        assert!(s.selected_node.is_none());
        assert_eq!(s.error.as_deref(), Some("No path found between the pages"));
    }

    #[test]
    fn restored_query_fills_the_fields() {
        let mut s = UiState::new(6, "https://en.wikipedia.org/wiki/");
        s.apply_event(SessionEvent::QueryChanged(Some(
            SearchQuery::new("Albert Einstein", "Physics").unwrap(),
        )));
        assert_eq!(s.start_input, "Albert Einstein");
        assert_eq!(s.end_input, "Physics");
        s.apply_event(SessionEvent::QueryChanged(None));
        assert!(s.start_input.is_empty());
    }

    #[test]
    fn node_selection_wraps() {
        let mut s = UiState::new(6, "https://en.wikipedia.org/wiki/");
        s.select_next_node();
        assert_eq!(s.selected_node, None);

        s.apply_event(completed("A", "C", &["A", "B", "C"]));
        s.select_next_node();
        assert_eq!(s.selected_title(), Some("A"));
        s.select_prev_node();
        assert_eq!(s.selected_title(), Some("C"));
        s.select_next_node();
        assert_eq!(s.selected_title(), Some("A"));
    }

    #[test]
    fn graph_width_change_resizes_simulation() {
        let mut s = UiState::new(6, "https://en.wikipedia.org/wiki/");
        s.apply_event(completed("A", "B", &["A", "B"]));
        s.set_graph_width(1040.0);
        assert_eq!(s.simulation.as_ref().unwrap().size().0, 1000.0);
    }
}
