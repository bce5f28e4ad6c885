//! services/api/src/web/state.rs
//!
//! Defines the application's shared and connection-specific states.

use std::sync::Arc;
use study_session_core::{
    DebateDialogueService, DebateSession, EntitlementPolicy, FlashcardSession, QuizSession,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub dialogue: Arc<dyn DebateDialogueService>,
    pub policy: EntitlementPolicy,
}

//=========================================================================================
// ConnectionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The single session a connection owns.
pub enum ActiveSession {
    /// Shared with in-flight dialogue tasks, which resolve into it when they finish.
    Debate(Arc<Mutex<DebateSession>>),
    Quiz(QuizSession),
    Flashcards(FlashcardSession),
}

/// The state for a single, active WebSocket connection.
pub struct ConnectionState {
    pub session: ActiveSession,
    /// Cancelled when the client leaves; aborts any outstanding dialogue request.
    pub cancellation_token: CancellationToken,
}

impl ConnectionState {
    pub fn new(session: ActiveSession) -> Self {
        Self {
            session,
            cancellation_token: CancellationToken::new(),
        }
    }
}
