//! crates/study_session_core/src/quiz.rs
//!
//! Quiz traversal over a fixed set of questions with deterministic scoring.

use crate::domain::Question;
use crate::error::{SessionError, ValidationError};

/// Feedback shown once the current question has been answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_label: String,
    pub explanation: String,
}

/// The final result of a completed quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    pub score: usize,
    pub max_score: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    cursor: usize,
    selection: Option<String>,
    score: usize,
    /// Questions that have already contributed to `score`, answered or not correctly.
    scored: Vec<bool>,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
        if let Some(bad) = questions
            .iter()
            .find(|q| !q.options.contains_key(&q.correct_label))
        {
            return Err(ValidationError::MalformedQuestion(bad.id.clone()).into());
        }

        let scored = vec![false; questions.len()];
        Ok(Self {
            questions,
            cursor: 0,
            selection: None,
            score: 0,
            scored,
        })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> &Question {
        &self.questions[self.cursor]
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    /// Feedback for the current question, available once it has been answered.
    pub fn feedback(&self) -> Option<AnswerFeedback> {
        let selection = self.selection.as_ref()?;
        let question = self.current();
        Some(AnswerFeedback {
            correct: *selection == question.correct_label,
            correct_label: question.correct_label.clone(),
            explanation: question.explanation.clone(),
        })
    }

    pub fn answer(&mut self, label: &str) -> Result<AnswerFeedback, SessionError> {
        if self.selection.is_some() {
            return Err(ValidationError::AlreadyAnswered.into());
        }
        if !self.current().options.contains_key(label) {
            return Err(ValidationError::UnknownOption(label.to_string()).into());
        }

        let correct = label == self.current().correct_label;
        if !self.scored[self.cursor] {
            self.scored[self.cursor] = true;
            if correct {
                self.score += 1;
            }
        }
        self.selection = Some(label.to_string());

        let question = self.current();
        Ok(AnswerFeedback {
            correct,
            correct_label: question.correct_label.clone(),
            explanation: question.explanation.clone(),
        })
    }

    /// Moves to the next question. The current one must be answered first; on the
    /// last question this is a no-op.
    pub fn advance(&mut self) -> Result<(), SessionError> {
        if self.selection.is_none() {
            return Err(ValidationError::Unanswered.into());
        }
        if self.cursor + 1 < self.questions.len() {
            self.cursor += 1;
            self.selection = None;
        }
        Ok(())
    }

    /// Steps back one question. Scoring is never replayed for revisited questions.
    pub fn previous(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.selection = None;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.questions.len() - 1 && self.selection.is_some()
    }

    pub fn percentage(&self) -> u32 {
        (self.score as f64 / self.questions.len() as f64 * 100.0).round() as u32
    }

    pub fn outcome(&self) -> Option<QuizOutcome> {
        self.is_complete().then(|| QuizOutcome {
            score: self.score,
            max_score: self.questions.len(),
            percentage: self.percentage(),
        })
    }

    pub fn restart(&mut self) {
        self.cursor = 0;
        self.selection = None;
        self.score = 0;
        self.scored.iter_mut().for_each(|s| *s = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn question(id: &str, correct: &str) -> Question {
        let options: BTreeMap<String, String> = [("A", "Alpha"), ("B", "Beta"), ("C", "Gamma")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Question {
            id: id.to_string(),
            prompt: format!("Question {id}?"),
            options,
            correct_label: correct.to_string(),
            explanation: format!("{correct} is right."),
            difficulty: None,
        }
    }

    fn quiz(n: usize) -> QuizSession {
        QuizSession::new((0..n).map(|i| question(&format!("q{i}"), "A")).collect()).unwrap()
    }

    #[test]
    fn two_of_three_correct_scores_sixty_seven_percent() {
        let mut q = quiz(3);
        assert!(q.answer("A").unwrap().correct);
        q.advance().unwrap();
        assert!(!q.answer("B").unwrap().correct);
        q.advance().unwrap();
        q.answer("A").unwrap();

        assert!(q.is_complete());
        assert_eq!(q.score(), 2);
        assert_eq!(
            q.outcome(),
            Some(QuizOutcome {
                score: 2,
                max_score: 3,
                percentage: 67
            })
        );
    }

    #[test]
    fn reanswering_is_rejected_and_changes_nothing() {
        let mut q = quiz(2);
        q.answer("B").unwrap();
        let err = q.answer("A").unwrap_err();
        assert_eq!(err, SessionError::Validation(ValidationError::AlreadyAnswered));
        assert_eq!(q.score(), 0);
        assert_eq!(q.selection(), Some("B"));
    }

    #[test]
    fn cannot_advance_past_an_unanswered_question() {
        let mut q = quiz(2);
        assert_eq!(
            q.advance().unwrap_err(),
            SessionError::Validation(ValidationError::Unanswered)
        );
        assert_eq!(q.cursor(), 0);
    }

    #[test]
    fn advance_on_last_question_keeps_cursor() {
        let mut q = quiz(1);
        q.answer("A").unwrap();
        q.advance().unwrap();
        assert_eq!(q.cursor(), 0);
        assert!(q.is_complete());
    }

    #[test]
    fn going_back_never_rescores() {
        let mut q = quiz(2);
        q.answer("A").unwrap();
        q.advance().unwrap();
        q.previous();
        assert_eq!(q.cursor(), 0);
        assert!(q.selection().is_none());

        q.answer("A").unwrap();
        assert_eq!(q.score(), 1);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let mut q = quiz(1);
        assert!(matches!(
            q.answer("Z").unwrap_err(),
            SessionError::Validation(ValidationError::UnknownOption(_))
        ));
        assert!(q.selection().is_none());
    }

    #[test]
    fn construction_validates_content() {
        assert_eq!(
            QuizSession::new(vec![]).unwrap_err(),
            SessionError::Validation(ValidationError::EmptyContent)
        );
        assert!(matches!(
            QuizSession::new(vec![question("q1", "D")]).unwrap_err(),
            SessionError::Validation(ValidationError::MalformedQuestion(id)) if id == "q1"
        ));
    }

    #[test]
    fn restart_clears_progress() {
        let mut q = quiz(2);
        q.answer("A").unwrap();
        q.advance().unwrap();
        q.restart();
        assert_eq!((q.cursor(), q.score()), (0, 0));
        q.answer("A").unwrap();
        assert_eq!(q.score(), 1);
    }
}
