//! Error types for study-core.

use thiserror::Error;

use crate::session::SessionStatus;
use crate::types::StudyMode;

/// Result type alias using SessionError.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Contract violations raised by the session engine.
///
/// None of these are runtime conditions to retry: they mean the caller drove
/// the session in a way its state machine does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("deck has no cards to study")]
    EmptyDeck,

    #[error("cannot {operation} while session is {status}")]
    InvalidState {
        operation: &'static str,
        status: SessionStatus,
    },

    #[error("cannot {operation} in {mode} mode")]
    WrongMode {
        operation: &'static str,
        mode: StudyMode,
    },

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("answer must be revealed before rating")]
    AnswerHidden,

    #[error("no option selected")]
    NoSelection,

    #[error("option {index} out of range ({available} available)")]
    InvalidOption { index: usize, available: usize },
}
