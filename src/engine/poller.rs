//! Task status polling.
//!
//! The poller never holds controller state. Each request and each timer runs
//! as its own task and reports back through a channel with the [`PollTicket`]
//! it was issued for; the controller decides whether the ticket is still live.

use super::{ApiError, PathfinderApi, TaskProgress, TaskStatusResponse};
use crate::model::{PathResult, TaskHandle, TaskId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

/// Identity of one polling chain. Matches a [`TaskHandle`] while the chain is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTicket {
    pub task_id: TaskId,
    pub generation: u64,
}

impl PollTicket {
    pub fn is_for(&self, handle: Option<&TaskHandle>) -> bool {
        handle.is_some_and(|h| h.task_id == self.task_id && h.generation == self.generation)
    }
}

impl From<&TaskHandle> for PollTicket {
    fn from(h: &TaskHandle) -> Self {
        Self {
            task_id: h.task_id.clone(),
            generation: h.generation,
        }
    }
}

/// Continuations delivered back to the controller.
#[derive(Debug)]
pub enum PollMessage {
    /// The reschedule timer fired; the next request may be issued.
    Due(PollTicket),
    /// A status request finished.
    Resolved {
        ticket: PollTicket,
        result: Result<TaskStatusResponse, ApiError>,
    },
}

/// What one status response means for the session.
#[derive(Debug)]
pub enum PollVerdict {
    Pending,
    InProgress(TaskProgress),
    Success(PathResult),
    /// The task finished with a result record that holds no path.
    SuccessWithoutPath { error: Option<String> },
    Failure(String),
    Unrecognized(String),
}

pub fn classify(resp: TaskStatusResponse) -> PollVerdict {
    match resp.status.as_str() {
        "PENDING" => PollVerdict::Pending,
        "IN_PROGRESS" => PollVerdict::InProgress(resp.progress.unwrap_or_default()),
        "SUCCESS" => {
            let payload = resp.result.unwrap_or_default();
            if payload.path.is_empty() {
                PollVerdict::SuccessWithoutPath {
                    error: payload.error,
                }
            } else {
                PollVerdict::Success(payload.into_path_result())
            }
        }
        "FAILURE" => PollVerdict::Failure(
            resp.error
                .or(resp.message)
                .unwrap_or_else(|| "Search failed".to_string()),
        ),
        other => PollVerdict::Unrecognized(other.to_string()),
    }
}

/// Issues status requests and reschedule timers for the controller.
#[derive(Clone)]
pub struct Poller {
    api: Arc<dyn PathfinderApi>,
    interval: Duration,
    tx: UnboundedSender<PollMessage>,
}

impl Poller {
    pub fn new(
        api: Arc<dyn PathfinderApi>,
        interval: Duration,
        tx: UnboundedSender<PollMessage>,
    ) -> Self {
        Self { api, interval, tx }
    }

    /// Issue one status request now.
    pub fn dispatch(&self, ticket: PollTicket) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            trace!(task_id = %ticket.task_id, "polling");
            let result = api.task_status(&ticket.task_id).await;
            let _ = tx.send(PollMessage::Resolved { ticket, result });
        });
    }

    /// Arm the reschedule timer. Nothing is requested until the controller
    /// accepts the resulting [`PollMessage::Due`].
    pub fn schedule(&self, ticket: PollTicket) {
        let tx = self.tx.clone();
        let interval = self.interval;
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let _ = tx.send(PollMessage::Due(ticket));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedApi;

    fn status(json: &str) -> TaskStatusResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn classify_maps_every_status() {
        assert!(matches!(
            classify(status(r#"{"status": "PENDING"}"#)),
            PollVerdict::Pending
        ));
        match classify(status(
            r#"{"status": "IN_PROGRESS", "progress": {"search_stats": {"nodes_explored": 42, "current_depth": 2}}}"#,
        )) {
            PollVerdict::InProgress(p) => {
                let stats = p.search_stats.unwrap();
                assert_eq!(stats.nodes_explored, Some(42));
                assert_eq!(stats.current_depth, Some(2));
            }
            other => panic!("unexpected verdict {other:?}"),
        }
        match classify(status(
            r#"{"status": "SUCCESS", "result": {"path": ["A", "B", "C"], "search_time": 1.0}}"#,
        )) {
            PollVerdict::Success(r) => assert_eq!(r.path.len(), 3),
            other => panic!("unexpected verdict {other:?}"),
        }
        match classify(status(r#"{"status": "FAILURE", "error": "boom"}"#)) {
            PollVerdict::Failure(msg) => assert_eq!(msg, "boom"),
            other => panic!("unexpected verdict {other:?}"),
        }
        match classify(status(r#"{"status": "RETRY"}"#)) {
            PollVerdict::Unrecognized(s) => assert_eq!(s, "RETRY"),
            other => panic!("unexpected verdict {other:?}"),
        }
    }

    #[test]
    fn in_progress_without_payload_is_not_an_error() {
        let verdict = classify(status(r#"{"status": "IN_PROGRESS"}"#));
        assert!(matches!(verdict, PollVerdict::InProgress(_)));
    }

    #[test]
    fn success_with_empty_path_is_its_own_verdict() {
        let verdict = classify(status(r#"{"status": "SUCCESS", "result": {"path": []}}"#));
        assert!(matches!(
            verdict,
            PollVerdict::SuccessWithoutPath { error: None }
        ));
        let verdict = classify(status(r#"{"status": "SUCCESS"}"#));
        assert!(matches!(verdict, PollVerdict::SuccessWithoutPath { .. }));
    }

    #[test]
    fn ticket_matches_only_same_generation() {
        let handle = TaskHandle {
            task_id: TaskId("t1".into()),
            generation: 3,
        };
        let ticket = PollTicket::from(&handle);
        assert!(ticket.is_for(Some(&handle)));
        let newer = TaskHandle {
            generation: 4,
            ..handle.clone()
        };
        assert!(!ticket.is_for(Some(&newer)));
        assert!(!ticket.is_for(None));
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_waits_one_interval_before_due() {
        let api = Arc::new(ScriptedApi::new());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let poller = Poller::new(api.clone(), Duration::from_secs(1), tx);
        let ticket = PollTicket {
            task_id: TaskId("t1".into()),
            generation: 1,
        };

        let start = tokio::time::Instant::now();
        poller.schedule(ticket.clone());
        match rx.recv().await.unwrap() {
            PollMessage::Due(t) => assert_eq!(t, ticket),
            other => panic!("unexpected message {other:?}"),
        }
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(api.status_calls("t1"), 0);
    }

    #[tokio::test]
    async fn dispatch_reports_the_response_with_its_ticket() {
        let api = Arc::new(ScriptedApi::new());
        api.push_status("t1", Ok(status(r#"{"status": "PENDING"}"#)));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let poller = Poller::new(api.clone(), Duration::from_secs(1), tx);
        let ticket = PollTicket {
            task_id: TaskId("t1".into()),
            generation: 7,
        };

        poller.dispatch(ticket.clone());
        match rx.recv().await.unwrap() {
            PollMessage::Resolved { ticket: t, result } => {
                assert_eq!(t, ticket);
                assert_eq!(result.unwrap().status, "PENDING");
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(api.status_calls("t1"), 1);
    }
}
