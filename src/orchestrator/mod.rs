//! Session orchestration.
//!
//! This module owns the search task lifecycle (submit, poll, complete, fail,
//! clear, resume) and the decisions made on each poll response. UI and CLI
//! layers drive it through [`UiCommand`]s and observe it through
//! [`SessionEvent`](crate::model::SessionEvent)s.

mod controller;
mod outcome;

pub(crate) use controller::{
    run_controller, submit_eligibility, ControllerInbox, RestoreOutcome, SessionController,
    UiCommand,
};
