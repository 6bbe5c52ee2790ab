use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Longest title the backend's request schema accepts.
pub const MAX_TITLE_CHARS: usize = 255;

/// Default length of the depth indicator (the backend's `MAX_SEARCH_DEPTH`).
pub const DEFAULT_MAX_DEPTH: u32 = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub wiki_base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Length of the depth indicator.
    pub max_depth: u32,
    /// Depth limit forwarded to the backend, if any.
    pub search_max_depth: Option<u32>,
    pub algorithm: Option<Algorithm>,
    pub user_agent: String,
    pub session_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            wiki_base_url: "https://en.wikipedia.org/wiki/".into(),
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            max_depth: DEFAULT_MAX_DEPTH,
            search_max_depth: None,
            algorithm: None,
            user_agent: format!("wikipath-cli/{}", env!("CARGO_PKG_VERSION")),
            session_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Bfs,
    Bidirectional,
}

/// A validated start/end pair. Both titles are trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub start_title: String,
    pub end_title: String,
}

impl SearchQuery {
    pub fn new(start: &str, end: &str) -> Result<Self, SessionError> {
        let start_title = validate_title("Start page", start)?;
        let end_title = validate_title("End page", end)?;
        Ok(Self {
            start_title,
            end_title,
        })
    }

    /// True when the raw field values name this query once trimmed.
    pub fn matches_fields(&self, start: &str, end: &str) -> bool {
        self.start_title == start.trim() && self.end_title == end.trim()
    }
}

fn validate_title(label: &str, raw: &str) -> Result<String, SessionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SessionError::Validation(format!("{label} is required")));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(SessionError::Validation(format!(
            "{label} must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start_title, self.end_title)
    }
}

/// Server-issued task identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The controller's claim on one backend task. The generation distinguishes
/// two claims on the same id (e.g. a resumed session racing a stale timer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: TaskId,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    pub path: Vec<String>,
    pub search_time_seconds: f64,
    pub nodes_explored: u64,
}

impl PathResult {
    /// Number of clicks between start and end.
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Idle,
    InProgress,
    Completed,
}

/// The single record kept in local storage between runs.
///
/// Always written whole. Build it through [`PersistedSession::in_progress`] or
/// [`PersistedSession::completed`] so the status invariants hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub start_page: String,
    pub end_page: String,
    #[serde(default)]
    pub task_id: Option<TaskId>,
    pub status: SessionStatus,
    #[serde(default)]
    pub result: Option<PathResult>,
    #[serde(rename = "timestamp")]
    pub saved_at: String,
}

impl PersistedSession {
    pub fn in_progress(query: &SearchQuery, task_id: TaskId) -> Self {
        Self {
            start_page: query.start_title.clone(),
            end_page: query.end_title.clone(),
            task_id: Some(task_id),
            status: SessionStatus::InProgress,
            result: None,
            saved_at: now_rfc3339(),
        }
    }

    /// Returns `None` for an empty path; a completed record always has one.
    pub fn completed(query: &SearchQuery, result: PathResult) -> Option<Self> {
        if result.path.is_empty() {
            return None;
        }
        Some(Self {
            start_page: query.start_title.clone(),
            end_page: query.end_title.clone(),
            task_id: None,
            status: SessionStatus::Completed,
            result: Some(result),
            saved_at: now_rfc3339(),
        })
    }

    pub fn is_consistent(&self) -> bool {
        match self.status {
            SessionStatus::Idle => true,
            SessionStatus::InProgress => self
                .task_id
                .as_ref()
                .is_some_and(|id| !id.as_str().trim().is_empty()),
            SessionStatus::Completed => self
                .result
                .as_ref()
                .is_some_and(|r| !r.path.is_empty()),
        }
    }

    pub fn query(&self) -> Option<SearchQuery> {
        SearchQuery::new(&self.start_page, &self.end_page).ok()
    }
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Display-safe view of one progress payload. Replaced whole on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub current_depth: u32,
    pub max_depth: u32,
    pub nodes_explored: u64,
    pub queue_size: u64,
    pub last_node: String,
    pub elapsed_seconds: f64,
    pub start_title: String,
    pub end_title: String,
    pub status_message: Option<String>,
}

/// Lifecycle phase of the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
}

impl ControllerPhase {
    pub fn is_active(self) -> bool {
        matches!(self, ControllerPhase::Submitting | ControllerPhase::Polling)
    }

    pub fn label(self) -> &'static str {
        match self {
            ControllerPhase::Idle => "Idle",
            ControllerPhase::Submitting => "Submitting",
            ControllerPhase::Polling => "Searching",
            ControllerPhase::Completed => "Completed",
            ControllerPhase::Failed => "Failed",
        }
    }
}

/// Events emitted by the controller and consumed by the TUI or headless output.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged(ControllerPhase),
    /// The query the controller is working on, or `None` after a clear.
    QueryChanged(Option<SearchQuery>),
    /// A task was accepted or rehydrated.
    TaskAccepted { task_id: TaskId, resumed: bool },
    Progress(ProgressSnapshot),
    Completed {
        query: SearchQuery,
        // Boxed to keep the event small.
        result: Box<PathResult>,
        restored: bool,
    },
    Failed { message: String },
    Cleared,
    Info(String),
}
