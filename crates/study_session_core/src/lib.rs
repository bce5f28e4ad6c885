pub mod debate;
pub mod domain;
pub mod engine;
pub mod entitlement;
pub mod error;
pub mod flashcards;
pub mod ports;
pub mod quiz;

pub use debate::{
    DebateConfig, DebateSession, DebateStatus, PendingCall, RequestKind, RequestTicket, Resolution,
};
pub use domain::{Card, ContentRef, Difficulty, Question, Speaker, Stance, Tier, Turn, Verdict, Winner};
pub use engine::DebateEngine;
pub use entitlement::{can_use, daily_request_limit, Capability, EntitlementPolicy};
pub use error::{SessionError, ValidationError};
pub use flashcards::FlashcardSession;
pub use ports::{DebateDialogueService, PortError, PortResult};
pub use quiz::{AnswerFeedback, QuizOutcome, QuizSession};
