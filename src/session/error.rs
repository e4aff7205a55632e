//! Session-level error taxonomy

use super::assembler::StreamFailure;
use super::turn::TurnError;
use crate::api::ApiError;
use crate::quiz::{AssessmentKind, QuizError};
use crate::state_machine::TransitionError;
use thiserror::Error;

/// Message shown when a reply exceeds the stream deadline
pub const TIMEOUT_MESSAGE: &str = "AI took too long to respond. Please retry.";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Remote call failed; the learner may retry
    #[error(transparent)]
    Transport(ApiError),

    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,

    #[error("Reply cancelled")]
    Cancelled,

    /// Rejected locally, nothing was sent
    #[error("{} question(s) still need a complete answer", .missing.len())]
    IncompleteAnswers { missing: Vec<String> },

    #[error("Failed to generate {kind} questions: {message}")]
    GenerationFailed {
        kind: AssessmentKind,
        message: String,
    },

    /// Remote reset failed; local state is untouched
    #[error("Reset rejected: {0}")]
    ResetRejected(ApiError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Quiz(QuizError),

    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error("Learner profile is not loaded yet")]
    ProfileNotLoaded,

    #[error("No weak areas to revise")]
    NoWeakAreas,

    #[error("No failed message to retry")]
    NothingToRetry,
}

impl SessionError {
    /// Whether repeating the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            SessionError::Transport(e) | SessionError::ResetRejected(e) => e.kind.is_retryable(),
            SessionError::Timeout | SessionError::Cancelled | SessionError::GenerationFailed { .. } => {
                true
            }
            _ => false,
        }
    }
}

impl From<QuizError> for SessionError {
    fn from(error: QuizError) -> Self {
        match error {
            QuizError::IncompleteAnswers { missing } => SessionError::IncompleteAnswers { missing },
            QuizError::Api(e) => SessionError::Transport(e),
            other => SessionError::Quiz(other),
        }
    }
}

impl From<StreamFailure> for SessionError {
    fn from(failure: StreamFailure) -> Self {
        match failure {
            StreamFailure::TimedOut(_) => SessionError::Timeout,
            StreamFailure::Cancelled => SessionError::Cancelled,
            StreamFailure::Transport(e) => SessionError::Transport(e),
            StreamFailure::Turn(e) => SessionError::Turn(e),
        }
    }
}
