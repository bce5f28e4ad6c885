//! crates/study_session_core/src/engine.rs
//!
//! An async driver that pairs a `DebateSession` with a `DebateDialogueService`
//! and runs each command straight through to its resolution. Callers that need
//! to release the session while a request is in flight (e.g. to allow a reset)
//! use the command/resolve methods on `DebateSession` directly instead.

use std::sync::Arc;

use crate::debate::{DebateConfig, DebateSession};
use crate::domain::{Difficulty, Stance, Tier};
use crate::error::SessionError;
use crate::ports::DebateDialogueService;

pub struct DebateEngine {
    session: DebateSession,
    dialogue: Arc<dyn DebateDialogueService>,
}

impl DebateEngine {
    pub fn new(config: DebateConfig, dialogue: Arc<dyn DebateDialogueService>) -> Self {
        Self {
            session: DebateSession::new(config),
            dialogue,
        }
    }

    pub fn session(&self) -> &DebateSession {
        &self.session
    }

    pub fn select_difficulty(&mut self, difficulty: Difficulty) -> Result<(), SessionError> {
        self.session.select_difficulty(difficulty)
    }

    pub fn set_tier(&mut self, tier: Tier) {
        self.session.set_tier(tier);
    }

    pub fn select_stance(&mut self, stance: Stance) -> Result<(), SessionError> {
        self.session.select_stance(stance)
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Opens the debate and waits for the opponent's first turn.
    pub async fn submit_thesis(&mut self, thesis: &str) -> Result<&DebateSession, SessionError> {
        let call = self.session.submit_thesis(thesis)?;
        let outcome = self.dialogue.start_debate(&call.request).await;
        self.session.resolve_opening(call.ticket, outcome)?;
        Ok(&self.session)
    }

    pub async fn submit_turn(&mut self, text: &str) -> Result<&DebateSession, SessionError> {
        let call = self.session.submit_turn(text)?;
        let outcome = self.dialogue.continue_debate(&call.request).await;
        self.session.resolve_reply(call.ticket, outcome)?;
        Ok(&self.session)
    }

    pub async fn retry_turn(&mut self) -> Result<&DebateSession, SessionError> {
        let call = self.session.retry_turn()?;
        let outcome = self.dialogue.continue_debate(&call.request).await;
        self.session.resolve_reply(call.ticket, outcome)?;
        Ok(&self.session)
    }

    /// Ends the debate and waits for the judge's verdict.
    pub async fn end_debate(&mut self) -> Result<&DebateSession, SessionError> {
        let call = self.session.request_judging()?;
        let outcome = self.dialogue.judge_debate(&call.request).await;
        self.session.resolve_verdict(call.ticket, outcome)?;
        Ok(&self.session)
    }
}
