//! Error taxonomy for a search session.

use crate::engine::ApiError;
use thiserror::Error;

/// Everything that can end or reject a search session.
///
/// `Validation` is resolved locally and never touches controller state. Every
/// other kind abandons the active task and clears the persisted session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("{message}")]
    ServerRejection { status: u16, message: String },

    #[error("Search failed: {0}")]
    TaskFailure(String),

    #[error("Unexpected task status from server: {0}")]
    Protocol(String),

    #[error("Malformed response from server: {0}")]
    MalformedResponse(String),

    #[error("No path found between the pages")]
    EmptyResult,
}

impl From<ApiError> for SessionError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Transport(inner) => SessionError::Transport(inner.to_string()),
            ApiError::Rejected { status, message } => {
                SessionError::ServerRejection { status, message }
            }
            ApiError::Decode(msg) => SessionError::MalformedResponse(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_message_is_user_facing() {
        assert_eq!(
            SessionError::EmptyResult.to_string(),
            "No path found between the pages"
        );
    }

    #[test]
    fn rejection_surfaces_server_message() {
        let e: SessionError = ApiError::Rejected {
            status: 400,
            message: "Invalid request data".into(),
        }
        .into();
        assert_eq!(e.to_string(), "Invalid request data");
    }

    #[test]
    fn undecodable_body_is_not_reported_as_a_task_status() {
        let e: SessionError = ApiError::Decode("missing field `status`".into()).into();
        assert_eq!(e, SessionError::MalformedResponse("missing field `status`".into()));
        assert_eq!(
            e.to_string(),
            "Malformed response from server: missing field `status`"
        );
    }
}
