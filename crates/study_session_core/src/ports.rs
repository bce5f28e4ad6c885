//! crates/study_session_core/src/ports.rs
//!
//! Defines the service contracts (traits) the session engines call into.
//! These traits form the boundary of the hexagonal architecture, keeping the core
//! independent of the AI backend and of how requests travel to it.

use async_trait::async_trait;

use crate::domain::{ContentRef, Difficulty, Stance, Turn, Winner};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g. network, API).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Dialogue Request and Reply Payloads
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningRequest {
    pub thesis: String,
    pub user_stance: Stance,
    pub difficulty: Difficulty,
    pub content: ContentRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningReply {
    pub ai_position: String,
    pub ai_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationRequest {
    pub topic: String,
    pub ai_position: String,
    pub difficulty: Difficulty,
    /// The full transcript, ending with `new_user_message`.
    pub transcript: Vec<Turn>,
    pub new_user_message: String,
    pub content: ContentRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationReply {
    pub ai_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgingRequest {
    pub topic: String,
    pub transcript: Vec<Turn>,
}

/// The judge's reply before range validation. Scores are kept wide so that the
/// engine, not the adapter, decides what an acceptable score is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictReply {
    pub winner: Winner,
    pub user_score: i64,
    pub ai_score: i64,
    pub summary: String,
    pub tip: String,
    pub user_strengths: Vec<String>,
    pub user_weaknesses: Vec<String>,
    pub ai_strengths: Vec<String>,
    pub ai_weaknesses: Vec<String>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DebateDialogueService: Send + Sync {
    /// Produces the opponent's opening turn for a new debate.
    async fn start_debate(&self, request: &OpeningRequest) -> PortResult<OpeningReply>;

    /// Produces the opponent's reply to the latest user turn.
    async fn continue_debate(&self, request: &ContinuationRequest)
        -> PortResult<ContinuationReply>;

    /// Scores a finished debate.
    async fn judge_debate(&self, request: &JudgingRequest) -> PortResult<VerdictReply>;
}
