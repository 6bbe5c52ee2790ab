use super::{ApiError, PathfinderApi};
use crate::model::{Algorithm, ClientConfig, PathResult, TaskId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct CreateTaskRequest {
    pub start: String,
    pub end: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<Algorithm>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskResponse {
    pub task_id: TaskId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchStats {
    #[serde(default)]
    pub nodes_explored: Option<u64>,
    #[serde(default)]
    pub current_depth: Option<u32>,
    #[serde(default)]
    pub last_node: Option<String>,
    #[serde(default)]
    pub queue_size: Option<u64>,
}

/// Progress payload of an IN_PROGRESS task. Every field may be missing; early
/// stages only carry a status line and the page titles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskProgress {
    #[serde(default)]
    pub search_stats: Option<SearchStats>,
    #[serde(default)]
    pub search_time_elapsed: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_page: Option<String>,
    #[serde(default)]
    pub end_page: Option<String>,
}

/// Result payload of a SUCCESS task. A task that finished by returning a
/// failure record also lands here, with an empty path and an `error`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskResultPayload {
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub search_time: Option<f64>,
    #[serde(default)]
    pub nodes_explored: Option<u64>,
    #[serde(default)]
    pub search_stats: Option<SearchStats>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskResultPayload {
    pub fn into_path_result(self) -> PathResult {
        let nodes_explored = self
            .search_stats
            .as_ref()
            .and_then(|s| s.nodes_explored)
            .or(self.nodes_explored)
            .unwrap_or(0);
        PathResult {
            path: self.path,
            search_time_seconds: self.search_time.unwrap_or(0.0),
            nodes_explored,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatusResponse {
    pub status: String,
    #[serde(default)]
    pub progress: Option<TaskProgress>,
    #[serde(default)]
    pub result: Option<TaskResultPayload>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreResult {
    pub start_page: String,
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
    pub total_links: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub redis_status: Option<String>,
    #[serde(default)]
    pub cache_status: Option<String>,
    #[serde(default)]
    pub wikipedia_api_status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Serialize)]
struct ExploreRequest<'a> {
    start: &'a str,
    max_links: u32,
}

/// reqwest-backed client for the pathfinding service.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid base URL {:?}", cfg.base_url))?;
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("build HTTP client")?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        endpoint_url(&self.base_url, segments)
    }
}

/// Append path segments to the base URL, percent-encoding each one.
pub(crate) fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::Decode(format!("base URL {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Message for a non-2xx response: the body's `message` when present, the
/// status reason otherwise.
pub(crate) fn rejection_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
            code,
        }) => match code {
            Some(code) => {
                debug!(%code, "backend rejected request");
                message
            }
            None => message,
        },
        _ => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: rejection_message(status, &body),
        });
    }
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl PathfinderApi for HttpBackend {
    async fn create_task(
        &self,
        request: &CreateTaskRequest,
    ) -> Result<CreateTaskResponse, ApiError> {
        let url = self.endpoint(&["getPath"])?;
        debug!(%url, start = %request.start, end = %request.end, "create task");
        let resp = self.http.post(url).json(request).send().await?;
        decode(resp).await
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatusResponse, ApiError> {
        let url = self.endpoint(&["tasks", "status", task_id.as_str()])?;
        let resp = self.http.get(url).send().await?;
        decode(resp).await
    }

    async fn explore(&self, start: &str, max_links: u32) -> Result<ExploreResult, ApiError> {
        let url = self.endpoint(&["explore"])?;
        let resp = self
            .http
            .post(url)
            .json(&ExploreRequest { start, max_links })
            .send()
            .await?;
        decode(resp).await
    }

    async fn health(&self) -> Result<HealthReport, ApiError> {
        let url = self.endpoint(&["health"])?;
        let resp = self.http.get(url).send().await?;
        // A degraded backend answers 503 with the same report body.
        let status = resp.status();
        let body = resp.text().await?;
        match serde_json::from_str::<HealthReport>(&body) {
            Ok(report) => Ok(report),
            Err(_) if !status.is_success() => Err(ApiError::Rejected {
                status: status.as_u16(),
                message: rejection_message(status, &body),
            }),
            Err(e) => Err(ApiError::Decode(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer exactly one GET with a canned response and return a client
    /// pointed at it.
    async fn backend_answering(status_line: &'static str, body: &'static str) -> HttpBackend {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(response.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        });
        HttpBackend {
            http: reqwest::Client::builder().no_proxy().build().unwrap(),
            base_url: Url::parse(&format!("http://{addr}/")).unwrap(),
        }
    }

    #[tokio::test]
    async fn non_success_status_becomes_rejection() {
        let api = backend_answering(
            "404 Not Found",
            r#"{"error": true, "message": "Task not found", "code": "TASK_NOT_FOUND"}"#,
        )
        .await;
        match api.task_status(&TaskId("gone".into())).await {
            Err(ApiError::Rejected { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Task not found");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_success_body_is_a_decode_error() {
        let api = backend_answering("200 OK", r#"{"task_id": "t1"}"#).await;
        assert!(matches!(
            api.task_status(&TaskId("t1".into())).await,
            Err(ApiError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn degraded_health_still_returns_the_report() {
        let api = backend_answering(
            "503 Service Unavailable",
            r#"{"status": "unhealthy", "redis_status": "unhealthy: refused",
                "cache_status": "healthy", "wikipedia_api_status": "healthy",
                "timestamp": "2024-01-01T00:00:00"}"#,
        )
        .await;
        let report = api.health().await.unwrap();
        assert!(!report.is_healthy());
        assert_eq!(report.redis_status.as_deref(), Some("unhealthy: refused"));
    }

    #[tokio::test]
    async fn health_without_a_report_body_is_rejected() {
        let api = backend_answering("502 Bad Gateway", "<html>bad gateway</html>").await;
        match api.health().await {
            Err(ApiError::Rejected { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn endpoint_encodes_task_id_segment() {
        let base = Url::parse("http://localhost:5000/").unwrap();
        let url = endpoint_url(&base, &["tasks", "status", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/tasks/status/a%2Fb%20c");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let base = Url::parse("https://example.org/api").unwrap();
        let url = endpoint_url(&base, &["getPath"]).unwrap();
        assert_eq!(url.as_str(), "https://example.org/api/getPath");
    }

    #[test]
    fn create_request_omits_unset_options() {
        let req = CreateTaskRequest {
            start: "Albert Einstein".into(),
            end: "Physics".into(),
            max_depth: None,
            algorithm: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v, serde_json::json!({"start": "Albert Einstein", "end": "Physics"}));

        let req = CreateTaskRequest {
            max_depth: Some(4),
            algorithm: Some(Algorithm::Bidirectional),
            ..req
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["max_depth"], 4);
        assert_eq!(v["algorithm"], "bidirectional");
    }

    #[test]
    fn rejection_prefers_body_message() {
        let msg = rejection_message(
            StatusCode::BAD_REQUEST,
            r#"{"error": true, "message": "Invalid request data", "code": "VALIDATION_ERROR"}"#,
        );
        assert_eq!(msg, "Invalid request data");

        let msg = rejection_message(StatusCode::SERVICE_UNAVAILABLE, "<html>oops</html>");
        assert_eq!(msg, "Service Unavailable");
    }

    #[test]
    fn status_payload_tolerates_partial_progress() {
        let resp: TaskStatusResponse = serde_json::from_str(
            r#"{"status": "IN_PROGRESS", "task_id": "t1",
                "progress": {"current": 10, "total": 100, "status": "Validating pages...",
                             "start_page": "A", "end_page": "B"}}"#,
        )
        .unwrap();
        let progress = resp.progress.unwrap();
        assert!(progress.search_stats.is_none());
        assert_eq!(progress.status.as_deref(), Some("Validating pages..."));
    }

    #[test]
    fn result_prefers_nested_node_count() {
        let payload: TaskResultPayload = serde_json::from_str(
            r#"{"path": ["A", "B"], "length": 2, "search_time": 0.5,
                "nodes_explored": 3, "search_stats": {"nodes_explored": 9}}"#,
        )
        .unwrap();
        let r = payload.into_path_result();
        assert_eq!(r.nodes_explored, 9);
        assert_eq!(r.path, vec!["A", "B"]);
        assert_eq!(r.search_time_seconds, 0.5);
    }

    #[test]
    fn failure_record_under_success_decodes_with_empty_path() {
        let resp: TaskStatusResponse = serde_json::from_str(
            r#"{"status": "SUCCESS", "task_id": "t1",
                "result": {"status": "FAILURE", "error": "Start page 'X' does not exist on Wikipedia",
                           "code": "PAGE_NOT_FOUND"}}"#,
        )
        .unwrap();
        let result = resp.result.unwrap();
        assert!(result.path.is_empty());
        assert!(result.error.is_some());
    }
}
