//! Test doubles shared by the unit tests.

use crate::engine::{
    ApiError, CreateTaskRequest, CreateTaskResponse, ExploreResult, HealthReport, PathfinderApi,
    TaskStatusResponse,
};
use crate::model::TaskId;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A backend that replays scripted responses and counts calls.
#[derive(Default)]
pub struct ScriptedApi {
    creates: Mutex<VecDeque<Result<CreateTaskResponse, ApiError>>>,
    create_requests: Mutex<Vec<CreateTaskRequest>>,
    statuses: Mutex<HashMap<String, VecDeque<Result<TaskStatusResponse, ApiError>>>>,
    status_calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_with(&self, task_id: &str) {
        self.push_create(Ok(CreateTaskResponse {
            task_id: TaskId(task_id.to_string()),
        }));
    }

    pub fn push_create(&self, response: Result<CreateTaskResponse, ApiError>) {
        self.creates.lock().unwrap().push_back(response);
    }

    pub fn push_status(&self, task_id: &str, response: Result<TaskStatusResponse, ApiError>) {
        self.statuses
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn push_status_json(&self, task_id: &str, json: &str) {
        let parsed = serde_json::from_str(json).expect("scripted status must be valid JSON");
        self.push_status(task_id, Ok(parsed));
    }

    pub fn create_calls(&self) -> usize {
        self.create_requests.lock().unwrap().len()
    }

    pub fn create_requests(&self) -> Vec<CreateTaskRequest> {
        self.create_requests.lock().unwrap().clone()
    }

    pub fn status_calls(&self, task_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PathfinderApi for ScriptedApi {
    async fn create_task(
        &self,
        request: &CreateTaskRequest,
    ) -> Result<CreateTaskResponse, ApiError> {
        self.create_requests.lock().unwrap().push(request.clone());
        self.creates
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Decode("no scripted create response".into())))
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatusResponse, ApiError> {
        *self
            .status_calls
            .lock()
            .unwrap()
            .entry(task_id.0.clone())
            .or_default() += 1;
        self.statuses
            .lock()
            .unwrap()
            .get_mut(task_id.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(ApiError::Decode("no scripted status response".into())))
    }

    async fn explore(&self, start: &str, _max_links: u32) -> Result<ExploreResult, ApiError> {
        Ok(ExploreResult {
            start_page: start.to_string(),
            nodes: vec![start.to_string()],
            edges: Vec::new(),
            total_links: 0,
        })
    }

    async fn health(&self) -> Result<HealthReport, ApiError> {
        Ok(HealthReport {
            status: "healthy".into(),
            redis_status: None,
            cache_status: None,
            wikipedia_api_status: None,
            timestamp: None,
        })
    }
}
