//! services/api/src/web/traversal.rs
//!
//! Applies quiz and flashcard commands. These sessions never touch the network,
//! so every command is answered synchronously with a fresh snapshot or a rejection.

use crate::web::protocol::{ClientMessage, ServerMessage};
use study_session_core::{FlashcardSession, QuizSession, SessionError};
use tracing::{info, warn};

/// Applies one client message to a quiz and returns the reply to send.
pub fn apply_quiz_message(quiz: &mut QuizSession, msg: ClientMessage) -> ServerMessage {
    let result = match msg {
        ClientMessage::Answer { label } => quiz.answer(&label).map(|_| ()),
        ClientMessage::NextQuestion => quiz.advance(),
        ClientMessage::PreviousQuestion => {
            quiz.previous();
            Ok(())
        }
        ClientMessage::RestartQuiz => {
            quiz.restart();
            Ok(())
        }
        other => return not_available(&other, "quiz"),
    };

    match result {
        Ok(()) => {
            if let Some(outcome) = quiz.outcome() {
                info!(
                    "Quiz complete: {}/{} ({}%)",
                    outcome.score, outcome.max_score, outcome.percentage
                );
            }
            ServerMessage::QuizState((&*quiz).into())
        }
        Err(e) => rejected(e),
    }
}

/// Applies one client message to a flashcard deck and returns the reply to send.
pub fn apply_flashcard_message(deck: &mut FlashcardSession, msg: ClientMessage) -> ServerMessage {
    match msg {
        ClientMessage::FlipCard => deck.flip(),
        ClientMessage::NextCard => deck.next(),
        ClientMessage::PreviousCard => deck.previous(),
        ClientMessage::ToggleKnown => {
            deck.toggle_known();
        }
        other => return not_available(&other, "flashcard"),
    }
    ServerMessage::FlashcardState((&*deck).into())
}

pub(crate) fn rejected(err: SessionError) -> ServerMessage {
    ServerMessage::Rejected {
        reason: err.to_string(),
    }
}

pub(crate) fn not_available(msg: &ClientMessage, kind: &str) -> ServerMessage {
    warn!("Ignoring {:?} in a {} session.", msg, kind);
    ServerMessage::Rejected {
        reason: format!("command not available in a {kind} session"),
    }
}
