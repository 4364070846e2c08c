//! Error types shared across quizdraft.
//!
//! `GatewayError` lives here rather than in `quizdraft-gateway` so the
//! confirmation workflow can classify failures without string matching.

use thiserror::Error;

use crate::model::QuestionId;

/// Errors that can occur when talking to the persistence gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The targeted question does not exist in the store.
    #[error("question {0} not found")]
    NotFound(u64),

    /// Authentication failed (missing or invalid token).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The store refused the payload.
    #[error("rejected by store (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The store returned any other error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// A local storage backend failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}

/// Reasons a single question cannot be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionError {
    #[error("statement is empty")]
    EmptyStatement,

    #[error("option {0:?} contains the '|' delimiter")]
    DelimiterInOption(String),

    #[error("correct answer {0:?} is not one of the options")]
    CorrectAnswerNotAnOption(String),
}

/// Errors raised by the edit buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("cannot add a question with an empty statement")]
    EmptyStatement,
}

/// Errors that stop a confirmation run before or after persisting.
///
/// Individual failed create/update/delete calls are not errors of the
/// workflow; they are counted in the confirmation report.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Another confirmation is still in flight.
    #[error("a confirmation is already in progress (state: {state})")]
    Busy { state: String },

    /// A question in the working copy cannot be persisted.
    #[error("question {id} is invalid: {source}")]
    InvalidQuestion {
        id: QuestionId,
        #[source]
        source: QuestionError,
    },

    /// The point total is off and the operator declined normalization.
    #[error("points add up to {total}, not 100; normalization was declined")]
    PointTotalRejected { total: u64 },

    /// Loading the authoritative set from the store failed.
    #[error("failed to reload question set: {0}")]
    Reload(#[source] GatewayError),

    /// The store could not regenerate the set.
    #[error("failed to regenerate question set: {0}")]
    Regenerate(#[source] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_messages() {
        assert_eq!(GatewayError::NotFound(7).to_string(), "question 7 not found");
        assert!(GatewayError::NotFound(7).is_not_found());
        assert!(!GatewayError::Timeout(30).is_not_found());
        let err = GatewayError::Rejected {
            status: 422,
            message: "points must be positive".into(),
        };
        assert!(err.to_string().contains("HTTP 422"));
    }

    #[test]
    fn workflow_error_keeps_source() {
        use std::error::Error as _;

        let err = WorkflowError::InvalidQuestion {
            id: QuestionId::Pending(2),
            source: QuestionError::EmptyStatement,
        };
        assert!(err.to_string().contains("pending-2"));
        assert!(err.source().is_some());
    }
}
