//! Session lifecycle controller.
//!
//! Owns submit/poll/complete/fail/clear/resume and emits events for
//! presentation layers. All state lives here; the poller and the submit
//! request run as detached tasks and report back through [`ControllerInbox`].

use super::outcome::{self, PollAction};
use crate::engine::poller::{classify, PollMessage, PollTicket, Poller};
use crate::engine::{ApiError, CreateTaskRequest, CreateTaskResponse, PathfinderApi};
use crate::error::SessionError;
use crate::model::{
    ClientConfig, ControllerPhase, PathResult, PersistedSession, ProgressSnapshot, SearchQuery,
    SessionEvent, SessionStatus, TaskHandle, TaskId,
};
use crate::progress;
use crate::storage::SessionStore;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Commands emitted by UI layers to drive the session.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Submit { start: String, end: String },
    Clear,
    Quit,
}

/// Result of a task creation request, tagged with the submit it belongs to.
#[derive(Debug)]
pub(crate) struct SubmitOutcome {
    generation: u64,
    query: SearchQuery,
    result: Result<CreateTaskResponse, ApiError>,
}

/// Receiving ends of the continuation channels.
pub(crate) struct ControllerInbox {
    pub polls: UnboundedReceiver<PollMessage>,
    pub submits: UnboundedReceiver<SubmitOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RestoreOutcome {
    /// Nothing (usable) was stored.
    Fresh,
    /// An in-progress task was picked up again.
    Resumed(TaskId),
    /// A completed result was rendered without contacting the backend.
    Rendered,
}

/// Whether the submit control should be enabled for the given field values.
pub(crate) fn submit_eligibility(
    task_active: bool,
    start: &str,
    end: &str,
    completed: Option<&SearchQuery>,
) -> bool {
    if task_active || start.trim().is_empty() || end.trim().is_empty() {
        return false;
    }
    !completed.is_some_and(|q| q.matches_fields(start, end))
}

pub(crate) struct SessionController<S: SessionStore> {
    api: Arc<dyn PathfinderApi>,
    store: S,
    poller: Poller,
    submit_tx: UnboundedSender<SubmitOutcome>,
    event_tx: UnboundedSender<SessionEvent>,
    cfg: ClientConfig,

    phase: ControllerPhase,
    generation: u64,
    /// Generation of the submit whose creation request is still in flight.
    pending_submit: Option<u64>,
    handle: Option<TaskHandle>,
    query: Option<SearchQuery>,
    /// Query of the result currently persisted as COMPLETED.
    completed_query: Option<SearchQuery>,
    progress: ProgressSnapshot,
    result: Option<PathResult>,
    last_error: Option<SessionError>,
}

impl<S: SessionStore> SessionController<S> {
    pub fn new(
        api: Arc<dyn PathfinderApi>,
        store: S,
        cfg: ClientConfig,
        event_tx: UnboundedSender<SessionEvent>,
    ) -> (Self, ControllerInbox) {
        let (poll_tx, polls) = mpsc::unbounded_channel();
        let (submit_tx, submits) = mpsc::unbounded_channel();
        let poller = Poller::new(api.clone(), cfg.poll_interval, poll_tx);
        let progress = progress::neutral(cfg.max_depth);
        let controller = Self {
            api,
            store,
            poller,
            submit_tx,
            event_tx,
            cfg,
            phase: ControllerPhase::Idle,
            generation: 0,
            pending_submit: None,
            handle: None,
            query: None,
            completed_query: None,
            progress,
            result: None,
            last_error: None,
        };
        (controller, ControllerInbox { polls, submits })
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    pub fn handle(&self) -> Option<&TaskHandle> {
        self.handle.as_ref()
    }

    pub fn query(&self) -> Option<&SearchQuery> {
        self.query.as_ref()
    }

    #[cfg(test)]
    pub fn progress(&self) -> &ProgressSnapshot {
        &self.progress
    }

    pub fn result(&self) -> Option<&PathResult> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_task_active(&self) -> bool {
        self.handle.is_some() || self.pending_submit.is_some()
    }

    #[cfg(test)]
    pub fn submit_enabled(&self, start: &str, end: &str) -> bool {
        submit_eligibility(
            self.is_task_active(),
            start,
            end,
            self.completed_query.as_ref(),
        )
    }

    /// Pick up whatever the last run left behind.
    pub fn restore(&mut self) -> RestoreOutcome {
        let Some(record) = self.store.load() else {
            return RestoreOutcome::Fresh;
        };
        let query = match record.query() {
            Some(q) if record.is_consistent() => q,
            _ => {
                warn!(status = ?record.status, "discarding inconsistent session record");
                self.erase_persisted();
                return RestoreOutcome::Fresh;
            }
        };

        match (record.status, record.task_id, record.result) {
            (SessionStatus::InProgress, Some(task_id), _) => {
                let generation = self.next_generation();
                let handle = TaskHandle {
                    task_id: task_id.clone(),
                    generation,
                };
                info!(%task_id, %query, "resuming search");
                self.progress = ProgressSnapshot {
                    start_title: query.start_title.clone(),
                    end_title: query.end_title.clone(),
                    ..progress::neutral(self.cfg.max_depth)
                };
                self.query = Some(query.clone());
                self.handle = Some(handle.clone());
                self.emit(SessionEvent::QueryChanged(Some(query)));
                self.emit(SessionEvent::Progress(self.progress.clone()));
                self.emit(SessionEvent::TaskAccepted {
                    task_id: task_id.clone(),
                    resumed: true,
                });
                self.set_phase(ControllerPhase::Polling);
                self.poller.dispatch(PollTicket::from(&handle));
                RestoreOutcome::Resumed(task_id)
            }
            (SessionStatus::Completed, _, Some(result)) => {
                debug!(%query, "rendering stored result");
                self.query = Some(query.clone());
                self.completed_query = Some(query.clone());
                self.result = Some(result.clone());
                self.emit(SessionEvent::QueryChanged(Some(query.clone())));
                self.emit(SessionEvent::Completed {
                    query,
                    result: Box::new(result),
                    restored: true,
                });
                self.set_phase(ControllerPhase::Completed);
                RestoreOutcome::Rendered
            }
            _ => {
                self.query = Some(query.clone());
                self.emit(SessionEvent::QueryChanged(Some(query)));
                RestoreOutcome::Fresh
            }
        }
    }

    /// Start a new search. A task already in flight is abandoned without
    /// server-side cancellation; its late responses are dropped.
    ///
    /// Validation failures return before any state changes.
    pub fn submit(&mut self, start: &str, end: &str) -> Result<(), SessionError> {
        let query = SearchQuery::new(start, end)?;
        if self.is_task_active() {
            info!(task = ?self.handle.as_ref().map(|h| &h.task_id), "abandoning active search");
            self.handle = None;
            self.pending_submit = None;
        }
        // Until the new task is accepted, nothing on disk may point at the old
        // one or at a result for a different query.
        self.erase_persisted();

        let generation = self.next_generation();
        self.pending_submit = Some(generation);
        self.query = Some(query.clone());
        self.completed_query = None;
        self.result = None;
        self.last_error = None;
        self.progress = ProgressSnapshot {
            start_title: query.start_title.clone(),
            end_title: query.end_title.clone(),
            ..progress::neutral(self.cfg.max_depth)
        };
        self.emit(SessionEvent::QueryChanged(Some(query.clone())));
        self.emit(SessionEvent::Progress(self.progress.clone()));
        self.set_phase(ControllerPhase::Submitting);

        let request = CreateTaskRequest {
            start: query.start_title.clone(),
            end: query.end_title.clone(),
            max_depth: self.cfg.search_max_depth,
            algorithm: self.cfg.algorithm,
        };
        let api = self.api.clone();
        let tx = self.submit_tx.clone();
        info!(%query, generation, "submitting search");
        tokio::spawn(async move {
            let result = api.create_task(&request).await;
            let _ = tx.send(SubmitOutcome {
                generation,
                query,
                result,
            });
        });
        Ok(())
    }

    pub fn on_submit_resolved(&mut self, outcome: SubmitOutcome) {
        if self.pending_submit != Some(outcome.generation) {
            debug!(generation = outcome.generation, "dropping stale submit response");
            return;
        }
        self.pending_submit = None;

        let resp = match outcome.result {
            Ok(resp) => resp,
            Err(e) => return self.fail(e.into()),
        };
        if resp.task_id.as_str().trim().is_empty() {
            return self.fail(SessionError::MalformedResponse("empty task id".into()));
        }

        let handle = TaskHandle {
            task_id: resp.task_id.clone(),
            generation: outcome.generation,
        };
        info!(task_id = %handle.task_id, "search accepted");
        self.persist(&PersistedSession::in_progress(
            &outcome.query,
            resp.task_id.clone(),
        ));
        self.handle = Some(handle.clone());
        self.emit(SessionEvent::TaskAccepted {
            task_id: resp.task_id,
            resumed: false,
        });
        self.set_phase(ControllerPhase::Polling);
        self.poller.dispatch(PollTicket::from(&handle));
    }

    pub fn on_poll_message(&mut self, msg: PollMessage) {
        match msg {
            PollMessage::Due(ticket) => {
                if !ticket.is_for(self.handle.as_ref()) {
                    debug!(task_id = %ticket.task_id, "dropping stale poll timer");
                    return;
                }
                self.poller.dispatch(ticket);
            }
            PollMessage::Resolved { ticket, result } => {
                if !ticket.is_for(self.handle.as_ref()) {
                    debug!(task_id = %ticket.task_id, "dropping stale poll response");
                    return;
                }
                let verdict = match result {
                    Ok(resp) => classify(resp),
                    Err(e) => return self.fail(e.into()),
                };
                match outcome::resolve(verdict, self.cfg.max_depth) {
                    PollAction::Continue(snapshot) => {
                        self.progress = snapshot;
                        self.emit(SessionEvent::Progress(self.progress.clone()));
                        self.poller.schedule(ticket);
                    }
                    PollAction::Complete(result) => self.complete(result),
                    PollAction::Fail(err) => self.fail(err),
                }
            }
        }
    }

    /// Drop everything: the active task, the stored record and the result.
    pub fn clear(&mut self) {
        if self.is_task_active() {
            info!("abandoning active search on clear");
        }
        self.next_generation();
        self.handle = None;
        self.pending_submit = None;
        self.erase_persisted();
        self.query = None;
        self.completed_query = None;
        self.result = None;
        self.last_error = None;
        self.progress = progress::neutral(self.cfg.max_depth);
        self.emit(SessionEvent::QueryChanged(None));
        self.emit(SessionEvent::Progress(self.progress.clone()));
        self.emit(SessionEvent::Cleared);
        self.set_phase(ControllerPhase::Idle);
    }

    /// Surface a message that does not change session state.
    pub fn notify(&self, message: impl Into<String>) {
        self.emit(SessionEvent::Info(message.into()));
    }

    fn complete(&mut self, result: PathResult) {
        self.handle = None;
        let Some(query) = self.query.clone() else {
            warn!("completed task has no query; ignoring result");
            return self.set_phase(ControllerPhase::Idle);
        };
        match PersistedSession::completed(&query, result.clone()) {
            Some(record) => self.persist(&record),
            None => return self.fail(SessionError::EmptyResult),
        }
        info!(
            %query,
            hops = result.hops(),
            nodes_explored = result.nodes_explored,
            "path found"
        );
        self.completed_query = Some(query.clone());
        self.result = Some(result.clone());
        self.emit(SessionEvent::Completed {
            query,
            result: Box::new(result),
            restored: false,
        });
        self.set_phase(ControllerPhase::Completed);
    }

    fn fail(&mut self, err: SessionError) {
        warn!("search failed: {err}");
        self.handle = None;
        self.pending_submit = None;
        self.completed_query = None;
        self.result = None;
        self.erase_persisted();
        self.emit(SessionEvent::Failed {
            message: err.to_string(),
        });
        self.last_error = Some(err);
        self.set_phase(ControllerPhase::Failed);
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn set_phase(&mut self, phase: ControllerPhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "phase change");
            self.phase = phase;
            self.emit(SessionEvent::PhaseChanged(phase));
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    fn persist(&mut self, record: &PersistedSession) {
        if let Err(e) = self.store.save(record) {
            warn!("failed to save session: {e:#}");
        }
    }

    fn erase_persisted(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!("failed to clear session: {e:#}");
        }
    }
}

/// Drive the controller from UI commands and task continuations until quit.
/// Hands the controller back so callers can read the final session state.
pub(crate) async fn run_controller<S: SessionStore>(
    mut controller: SessionController<S>,
    mut inbox: ControllerInbox,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
    restore: bool,
) -> Result<SessionController<S>> {
    if restore {
        let outcome = controller.restore();
        debug!(?outcome, "restore finished");
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Submit { start, end }) => {
                        if let Err(e) = controller.submit(&start, &end) {
                            controller.notify(e.to_string());
                        }
                    }
                    Some(UiCommand::Clear) => controller.clear(),
                    // A task still in flight stays persisted and resumes next launch.
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some(msg) = inbox.polls.recv() => controller.on_poll_message(msg),
            Some(outcome) = inbox.submits.recv() => controller.on_submit_resolved(outcome),
        }
    }
    Ok(controller)
}
