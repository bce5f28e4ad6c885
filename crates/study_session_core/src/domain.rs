//! crates/study_session_core/src/domain.rs
//!
//! Defines the pure, core data structures shared by the session engines.
//! These types are independent of any transport or serialization format.

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

//=========================================================================================
// Subscription Tier
//=========================================================================================

/// The subscription tier of the user who owns a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tier {
    #[default]
    Free,
    Pro,
    /// A short-lived premium pass. Grants the same capabilities as `Pro`.
    Sos,
}

impl Tier {
    pub fn is_premium(self) -> bool {
        !matches!(self, Tier::Free)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Sos => "sos",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Debate Types
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// The side a participant argues. The AI always takes the opposite of the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stance {
    #[default]
    For,
    Against,
}

impl Stance {
    pub fn opposite(self) -> Self {
        match self {
            Stance::For => Stance::Against,
            Stance::Against => Stance::For,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stance::For => "for",
            Stance::Against => "against",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Ai,
}

/// One speaker's single contribution to the debate transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Ai,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    User,
    Ai,
    Draw,
}

/// The external judge's final scoring of a finished debate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub winner: Winner,
    pub user_score: u8,
    pub ai_score: u8,
    pub summary: String,
    pub tip: String,
    pub user_strengths: Vec<String>,
    pub user_weaknesses: Vec<String>,
    pub ai_strengths: Vec<String>,
    pub ai_weaknesses: Vec<String>,
}

/// The study material a debate is anchored to, supplied by the session owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRef {
    pub material_id: Option<Uuid>,
    pub title: Option<String>,
    /// Raw material text the opponent may quote from.
    pub context: Option<String>,
}

//=========================================================================================
// Quiz and Flashcard Types
//=========================================================================================

/// A single multiple-choice question. Options are keyed by their label (e.g. "A").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: BTreeMap<String, String>,
    pub correct_label: String,
    pub explanation: String,
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub front: String,
    pub back: String,
}
