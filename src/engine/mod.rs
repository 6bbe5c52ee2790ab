//! Backend access: the HTTP client and the polling engine built on it.

mod backend;
pub mod poller;

pub use backend::{
    CreateTaskRequest, CreateTaskResponse, ExploreResult, HealthReport, HttpBackend, SearchStats,
    TaskProgress, TaskResultPayload, TaskStatusResponse,
};

use crate::model::TaskId;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from one backend call.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

/// The pathfinding service as seen by the client.
#[async_trait]
pub trait PathfinderApi: Send + Sync {
    /// Start a search; the backend answers with a task to poll.
    async fn create_task(&self, request: &CreateTaskRequest)
        -> Result<CreateTaskResponse, ApiError>;

    /// Current state of a task.
    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatusResponse, ApiError>;

    /// Outgoing links of a page, for neighbourhood views.
    async fn explore(&self, start: &str, max_links: u32) -> Result<ExploreResult, ApiError>;

    async fn health(&self) -> Result<HealthReport, ApiError>;
}
