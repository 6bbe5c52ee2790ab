//! What the controller does with one classified poll response.

use crate::engine::poller::PollVerdict;
use crate::error::SessionError;
use crate::model::{PathResult, ProgressSnapshot};
use crate::progress;

#[derive(Debug)]
pub(crate) enum PollAction {
    /// Show this snapshot and poll again after the interval.
    Continue(ProgressSnapshot),
    Complete(PathResult),
    Fail(SessionError),
}

pub(crate) fn resolve(verdict: PollVerdict, max_depth: u32) -> PollAction {
    match verdict {
        PollVerdict::Pending => PollAction::Continue(progress::neutral(max_depth)),
        PollVerdict::InProgress(payload) => {
            PollAction::Continue(progress::project(&payload, max_depth))
        }
        PollVerdict::Success(result) => PollAction::Complete(result),
        PollVerdict::SuccessWithoutPath { error } => PollAction::Fail(match error {
            Some(msg) if !msg.trim().is_empty() => SessionError::TaskFailure(msg),
            _ => SessionError::EmptyResult,
        }),
        PollVerdict::Failure(msg) => PollAction::Fail(SessionError::TaskFailure(msg)),
        PollVerdict::Unrecognized(status) => PollAction::Fail(SessionError::Protocol(status)),
    }
}
