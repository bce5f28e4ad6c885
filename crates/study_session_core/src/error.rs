//! crates/study_session_core/src/error.rs
//!
//! Error taxonomy for the session engines. Every variant leaves the session in a
//! previously valid state; none of them is fatal.

use crate::domain::Tier;
use crate::entitlement::Capability;
use crate::ports::PortError;

/// A command that was rejected locally, before any mutation or network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("thesis must not be empty")]
    EmptyThesis,
    #[error("thesis must be {min} to {max} characters, got {actual}")]
    ThesisLength {
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("turn text must not be empty")]
    EmptyTurn,
    #[error("turn text must be at most {max} characters")]
    TurnTooLong { max: usize },
    #[error("at least two full rounds are needed before judging")]
    NeedMoreRounds,
    #[error("a request is already in flight")]
    RequestInFlight,
    #[error("difficulty and stance can only be changed before the debate starts")]
    AlreadyStarted,
    #[error("command not allowed while the debate is {0}")]
    InvalidState(&'static str),
    #[error("the current question has already been answered")]
    AlreadyAnswered,
    #[error("the current question has not been answered yet")]
    Unanswered,
    #[error("unknown option label '{0}'")]
    UnknownOption(String),
    #[error("session content is empty")]
    EmptyContent,
    #[error("question '{0}' has no option for its correct label")]
    MalformedQuestion(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("'{capability}' is not available on the {tier} tier")]
    Entitlement { tier: Tier, capability: Capability },

    #[error("dialogue service failed: {0}")]
    Transport(String),

    /// The dialogue service answered, but the answer did not match its contract.
    #[error("dialogue service returned invalid data: {0}")]
    Data(String),
}

impl From<PortError> for SessionError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Transport(msg) => SessionError::Transport(msg),
            PortError::MalformedResponse(msg) => SessionError::Data(msg),
        }
    }
}

impl SessionError {
    /// Whether the error was raised locally without touching the session.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            SessionError::Validation(_) | SessionError::Entitlement { .. }
        )
    }
}
