//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the client view and the API
//! server. A connection owns exactly one session: a debate, a quiz or a
//! flashcard deck, chosen by the first message.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use study_session_core::{
    AnswerFeedback, Card, ContentRef, DebateSession, Difficulty, FlashcardSession, Question,
    QuizSession, Speaker, Stance, Tier, Turn, Verdict, Winner,
};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Wire Enums
//=========================================================================================

#[derive(Deserialize, Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TierDto {
    Free,
    Pro,
    Sos,
}

impl From<TierDto> for Tier {
    fn from(dto: TierDto) -> Self {
        match dto {
            TierDto::Free => Tier::Free,
            TierDto::Pro => Tier::Pro,
            TierDto::Sos => Tier::Sos,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyDto {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyDto> for Difficulty {
    fn from(dto: DifficultyDto) -> Self {
        match dto {
            DifficultyDto::Easy => Difficulty::Easy,
            DifficultyDto::Medium => Difficulty::Medium,
            DifficultyDto::Hard => Difficulty::Hard,
        }
    }
}

impl From<Difficulty> for DifficultyDto {
    fn from(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => DifficultyDto::Easy,
            Difficulty::Medium => DifficultyDto::Medium,
            Difficulty::Hard => DifficultyDto::Hard,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StanceDto {
    For,
    Against,
}

impl From<StanceDto> for Stance {
    fn from(dto: StanceDto) -> Self {
        match dto {
            StanceDto::For => Stance::For,
            StanceDto::Against => Stance::Against,
        }
    }
}

impl From<Stance> for StanceDto {
    fn from(stance: Stance) -> Self {
        match stance {
            Stance::For => StanceDto::For,
            Stance::Against => StanceDto::Against,
        }
    }
}

//=========================================================================================
// Content Payloads
//=========================================================================================

/// Quiz options as generated: either a list (`["A) 4", "B) 5"]`) labelled by
/// position, or an explicit label-to-text map.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum OptionsDto {
    Listed(Vec<String>),
    Labelled(BTreeMap<String, String>),
}

/// The correct answer, as an index into the options or as a label.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum CorrectDto {
    Index(usize),
    Label(String),
}

#[derive(Deserialize, Debug, Clone)]
pub struct QuestionDto {
    /// Defaults to the question's 1-based position.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "question")]
    pub prompt: String,
    pub options: OptionsDto,
    #[serde(alias = "correct_label")]
    pub correct: CorrectDto,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Option<DifficultyDto>,
}

fn option_label(index: usize) -> String {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| char::from(b'A' + i).to_string())
        .unwrap_or_else(|| (index + 1).to_string())
}

impl OptionsDto {
    fn into_labelled(self) -> BTreeMap<String, String> {
        match self {
            OptionsDto::Labelled(map) => map,
            OptionsDto::Listed(list) => list
                .into_iter()
                .enumerate()
                .map(|(i, text)| {
                    let label = option_label(i);
                    let text = text
                        .strip_prefix(&format!("{label})"))
                        .map(str::trim_start)
                        .unwrap_or(&text)
                        .to_string();
                    (label, text)
                })
                .collect(),
        }
    }
}

fn index_label(options: &BTreeMap<String, String>, index: usize) -> String {
    options
        .keys()
        .nth(index)
        .cloned()
        .unwrap_or_else(|| option_label(index))
}

impl QuestionDto {
    fn to_domain(self, position: usize) -> Question {
        let options = self.options.into_labelled();
        let correct_label = match self.correct {
            CorrectDto::Index(i) => index_label(&options, i),
            CorrectDto::Label(label) if options.contains_key(label.trim()) => {
                label.trim().to_string()
            }
            CorrectDto::Label(label) => match label.trim().parse::<usize>() {
                Ok(i) => index_label(&options, i),
                Err(_) => label,
            },
        };
        Question {
            id: self.id.unwrap_or_else(|| (position + 1).to_string()),
            prompt: self.prompt,
            options,
            correct_label,
            explanation: self.explanation,
            difficulty: self.difficulty.map(Difficulty::from),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CardDto {
    pub front: String,
    pub back: String,
}

pub fn questions_to_domain(questions: Vec<QuestionDto>) -> Vec<Question> {
    questions
        .into_iter()
        .enumerate()
        .map(|(position, q)| q.to_domain(position))
        .collect()
}

pub fn cards_to_domain(cards: Vec<CardDto>) -> Vec<Card> {
    cards
        .into_iter()
        .map(|c| Card {
            front: c.front,
            back: c.back,
        })
        .collect()
}

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens a debate session. One of the three `init_*` messages must come first.
    InitDebate {
        tier: TierDto,
        #[serde(default)]
        material_id: Option<Uuid>,
        #[serde(default)]
        material_title: Option<String>,
        #[serde(default)]
        material_context: Option<String>,
    },
    InitQuiz {
        questions: Vec<QuestionDto>,
    },
    InitFlashcards {
        cards: Vec<CardDto>,
    },

    // --- Debate ---
    /// The subscription changed mid-session, e.g. a day pass expired.
    ChangeTier { tier: TierDto },
    SelectDifficulty { difficulty: DifficultyDto },
    SelectStance { stance: StanceDto },
    SubmitThesis { text: String },
    SubmitTurn { text: String },
    RetryTurn,
    EndDebate,
    ResetDebate,

    // --- Quiz ---
    Answer { label: String },
    NextQuestion,
    PreviousQuestion,
    RestartQuiz,

    // --- Flashcards ---
    FlipCard,
    NextCard,
    PreviousCard,
    ToggleKnown,
}

impl ClientMessage {
    pub fn is_init(&self) -> bool {
        matches!(
            self,
            ClientMessage::InitDebate { .. }
                | ClientMessage::InitQuiz { .. }
                | ClientMessage::InitFlashcards { .. }
        )
    }
}

pub fn content_ref(
    material_id: Option<Uuid>,
    material_title: Option<String>,
    material_context: Option<String>,
) -> ContentRef {
    ContentRef {
        material_id,
        title: material_title,
        context: material_context,
    }
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms successful session initialization.
    SessionInitialized { kind: SessionKind },

    DebateState(DebateSnapshot),
    QuizState(QuizSnapshot),
    FlashcardState(FlashcardSnapshot),

    /// A command was refused locally; the session is unchanged.
    Rejected { reason: String },

    /// A dialogue request failed. The attached snapshot shows the recovered state.
    Error { message: String },
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Debate,
    Quiz,
    Flashcards,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TurnDto {
    pub speaker: &'static str,
    pub text: String,
}

impl From<&Turn> for TurnDto {
    fn from(turn: &Turn) -> Self {
        let speaker = match turn.speaker {
            Speaker::User => "user",
            Speaker::Ai => "ai",
        };
        Self {
            speaker,
            text: turn.text.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VerdictDto {
    pub winner: &'static str,
    pub user_score: u8,
    pub ai_score: u8,
    pub summary: String,
    pub tip: String,
    pub user_strengths: Vec<String>,
    pub user_weaknesses: Vec<String>,
    pub ai_strengths: Vec<String>,
    pub ai_weaknesses: Vec<String>,
}

impl From<&Verdict> for VerdictDto {
    fn from(v: &Verdict) -> Self {
        let winner = match v.winner {
            Winner::User => "user",
            Winner::Ai => "ai",
            Winner::Draw => "draw",
        };
        Self {
            winner,
            user_score: v.user_score,
            ai_score: v.ai_score,
            summary: v.summary.clone(),
            tip: v.tip.clone(),
            user_strengths: v.user_strengths.clone(),
            user_weaknesses: v.user_weaknesses.clone(),
            ai_strengths: v.ai_strengths.clone(),
            ai_weaknesses: v.ai_weaknesses.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct DebateSnapshot {
    pub session_id: Uuid,
    pub status: &'static str,
    pub difficulty: DifficultyDto,
    pub user_stance: StanceDto,
    pub pending: bool,
    pub pending_thesis: Option<String>,
    pub ai_position: Option<String>,
    pub transcript: Vec<TurnDto>,
    pub can_judge: bool,
    pub verdict: Option<VerdictDto>,
    pub last_error: Option<String>,
}

impl From<&DebateSession> for DebateSnapshot {
    fn from(s: &DebateSession) -> Self {
        Self {
            session_id: s.id(),
            status: s.status().as_str(),
            difficulty: s.difficulty().into(),
            user_stance: s.user_stance().into(),
            pending: s.is_pending(),
            pending_thesis: s.pending_thesis().map(str::to_string),
            ai_position: s.ai_position().map(str::to_string),
            transcript: s.transcript().iter().map(TurnDto::from).collect(),
            can_judge: s.can_request_judging(),
            verdict: s.verdict().map(VerdictDto::from),
            last_error: s.last_error().map(str::to_string),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDto {
    pub correct: bool,
    pub correct_label: String,
    pub explanation: String,
}

impl From<AnswerFeedback> for FeedbackDto {
    fn from(f: AnswerFeedback) -> Self {
        Self {
            correct: f.correct,
            correct_label: f.correct_label,
            explanation: f.explanation,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct QuizSnapshot {
    pub cursor: usize,
    pub total: usize,
    pub prompt: String,
    pub options: BTreeMap<String, String>,
    pub selection: Option<String>,
    pub feedback: Option<FeedbackDto>,
    pub score: usize,
    pub complete: bool,
    /// Only present once the last question has been answered.
    pub percentage: Option<u32>,
}

impl From<&QuizSession> for QuizSnapshot {
    fn from(q: &QuizSession) -> Self {
        let question = q.current();
        Self {
            cursor: q.cursor(),
            total: q.len(),
            prompt: question.prompt.clone(),
            options: question.options.clone(),
            selection: q.selection().map(str::to_string),
            feedback: q.feedback().map(FeedbackDto::from),
            score: q.score(),
            complete: q.is_complete(),
            percentage: q.outcome().map(|o| o.percentage),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FlashcardSnapshot {
    pub cursor: usize,
    pub total: usize,
    pub visible_side: String,
    pub is_flipped: bool,
    pub is_known: bool,
    pub known_count: usize,
}

impl From<&FlashcardSession> for FlashcardSnapshot {
    fn from(d: &FlashcardSession) -> Self {
        Self {
            cursor: d.cursor(),
            total: d.len(),
            visible_side: d.visible_side().to_string(),
            is_flipped: d.is_flipped(),
            is_known: d.is_known(),
            known_count: d.known_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"init_debate","tier":"pro"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::InitDebate {
                tier: TierDto::Pro,
                material_id: None,
                ..
            }
        ));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"select_difficulty","difficulty":"hard"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::SelectDifficulty {
                difficulty: DifficultyDto::Hard
            }
        ));
    }

    #[test]
    fn question_accepts_labelled_map() {
        let raw = r#"{"type":"init_quiz","questions":[{"id":"q1","question":"2+2?","options":{"A":"4","B":"5"},"correct":"A"}]}"#;
        let ClientMessage::InitQuiz { questions } = serde_json::from_str(raw).unwrap() else {
            panic!("expected init_quiz");
        };
        let domain = questions_to_domain(questions);
        assert_eq!(domain[0].id, "q1");
        assert_eq!(domain[0].prompt, "2+2?");
        assert_eq!(domain[0].correct_label, "A");
        assert!(domain[0].explanation.is_empty());
    }

    #[test]
    fn question_accepts_generated_quiz_json() {
        let raw = r#"{"type":"init_quiz","questions":[
            {"question":"Capital of France?","options":["A) Lyon","B) Paris","C) Nice","D) Lille"],
             "correct":1,"explanation":"Paris is the capital.","difficulty":"easy"},
            {"question":"2+2?","options":["3","4"],"correct":"1"}
        ]}"#;
        let ClientMessage::InitQuiz { questions } = serde_json::from_str(raw).unwrap() else {
            panic!("expected init_quiz");
        };
        let domain = questions_to_domain(questions);

        assert_eq!(domain[0].id, "1");
        assert_eq!(domain[0].options["B"], "Paris");
        assert_eq!(domain[0].correct_label, "B");
        assert_eq!(domain[0].difficulty, Some(Difficulty::Easy));
        assert_eq!(domain[1].id, "2");
        assert_eq!(domain[1].options["A"], "3");
        assert_eq!(domain[1].correct_label, "B");

        let quiz = QuizSession::new(domain).unwrap();
        assert_eq!(quiz.len(), 2);
    }

    #[test]
    fn out_of_range_correct_index_is_caught_by_the_quiz() {
        let raw = r#"[{"question":"2+2?","options":["3","4"],"correct":5}]"#;
        let questions: Vec<QuestionDto> = serde_json::from_str(raw).unwrap();
        assert!(QuizSession::new(questions_to_domain(questions)).is_err());
    }

    #[test]
    fn server_snapshot_is_tagged() {
        let deck = FlashcardSession::new(vec![Card {
            front: "ion".into(),
            back: "charged atom".into(),
        }])
        .unwrap();
        let json =
            serde_json::to_value(ServerMessage::FlashcardState((&deck).into())).unwrap();
        assert_eq!(json["type"], "flashcard_state");
        assert_eq!(json["visible_side"], "ion");
    }
}
