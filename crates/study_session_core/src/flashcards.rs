//! crates/study_session_core/src/flashcards.rs
//!
//! Circular flashcard traversal. There is no terminal state; the deck can be
//! cycled indefinitely.

use std::collections::BTreeSet;

use crate::domain::Card;
use crate::error::{SessionError, ValidationError};

#[derive(Debug, Clone)]
pub struct FlashcardSession {
    cards: Vec<Card>,
    cursor: usize,
    is_flipped: bool,
    known: BTreeSet<usize>,
}

impl FlashcardSession {
    pub fn new(cards: Vec<Card>) -> Result<Self, SessionError> {
        if cards.is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
        Ok(Self {
            cards,
            cursor: 0,
            is_flipped: false,
            known: BTreeSet::new(),
        })
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> &Card {
        &self.cards[self.cursor]
    }

    pub fn is_flipped(&self) -> bool {
        self.is_flipped
    }

    /// The side of the current card that is facing the learner.
    pub fn visible_side(&self) -> &str {
        let card = self.current();
        if self.is_flipped {
            &card.back
        } else {
            &card.front
        }
    }

    pub fn flip(&mut self) {
        self.is_flipped = !self.is_flipped;
    }

    pub fn next(&mut self) {
        self.cursor = (self.cursor + 1) % self.cards.len();
        self.is_flipped = false;
    }

    pub fn previous(&mut self) {
        self.cursor = (self.cursor + self.cards.len() - 1) % self.cards.len();
        self.is_flipped = false;
    }

    /// Marks the current card as known, or unmarks it if it already was.
    pub fn toggle_known(&mut self) -> bool {
        if self.known.remove(&self.cursor) {
            false
        } else {
            self.known.insert(self.cursor);
            true
        }
    }

    pub fn is_known(&self) -> bool {
        self.known.contains(&self.cursor)
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(n: usize) -> FlashcardSession {
        FlashcardSession::new(
            (0..n)
                .map(|i| Card {
                    front: format!("term {i}"),
                    back: format!("definition {i}"),
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn next_wraps_around_after_a_full_cycle() {
        let mut d = deck(4);
        d.next();
        let start = d.cursor();
        for _ in 0..d.len() {
            d.flip();
            d.next();
            assert!(!d.is_flipped());
        }
        assert_eq!(d.cursor(), start);
    }

    #[test]
    fn previous_from_first_card_goes_to_last() {
        let mut d = deck(3);
        d.flip();
        d.previous();
        assert_eq!(d.cursor(), 2);
        assert!(!d.is_flipped());
    }

    #[test]
    fn flip_shows_the_back() {
        let mut d = deck(1);
        assert_eq!(d.visible_side(), "term 0");
        d.flip();
        assert_eq!(d.visible_side(), "definition 0");
        d.flip();
        assert!(!d.is_flipped());
    }

    #[test]
    fn known_cards_are_toggled_per_index() {
        let mut d = deck(3);
        assert!(d.toggle_known());
        d.next();
        assert!(d.toggle_known());
        assert_eq!(d.known_count(), 2);
        assert!(!d.toggle_known());
        assert_eq!(d.known_count(), 1);
        d.previous();
        assert!(d.is_known());
    }

    #[test]
    fn empty_deck_is_rejected() {
        assert!(FlashcardSession::new(vec![]).is_err());
    }
}
