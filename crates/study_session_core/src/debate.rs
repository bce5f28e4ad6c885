//! crates/study_session_core/src/debate.rs
//!
//! The debate session state machine.
//!
//! Every transition that needs the AI dialogue service is split in two: a command
//! (`submit_thesis`, `submit_turn`, `retry_turn`, `request_judging`) validates the
//! input, moves the session into its pending sub-state and hands back a
//! [`PendingCall`]; the matching `resolve_*` method later applies the service
//! outcome. A resolution is only applied if its [`RequestTicket`] is still the
//! one the session is waiting for, so replies that arrive after a reset or for a
//! superseded request are dropped instead of corrupting the transcript.

use uuid::Uuid;

use crate::domain::{ContentRef, Difficulty, Speaker, Stance, Tier, Turn, Verdict};
use crate::entitlement::{Capability, EntitlementPolicy};
use crate::error::{SessionError, ValidationError};
use crate::ports::{
    ContinuationReply, ContinuationRequest, JudgingRequest, OpeningReply, OpeningRequest,
    PortResult, VerdictReply,
};

/// Number of transcript entries (two full rounds) required before judging.
pub const MIN_TURNS_FOR_JUDGING: usize = 4;

/// Highest score the judge may award either side.
pub const MAX_SCORE: u8 = 10;

/// Accepted thesis length, in characters after trimming.
pub const THESIS_MIN_CHARS: usize = 5;
pub const THESIS_MAX_CHARS: usize = 500;

/// Longest accepted user turn, in characters after trimming.
pub const TURN_MAX_CHARS: usize = 2000;

//=========================================================================================
// Status, Tickets and Configuration
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebateStatus {
    NotStarted,
    AwaitingOpponent,
    InProgress,
    Judging,
    Finished,
    /// The last continuation request failed; the user's turn is in the transcript
    /// but has no reply yet.
    Failed,
}

impl DebateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DebateStatus::NotStarted => "not_started",
            DebateStatus::AwaitingOpponent => "awaiting_opponent",
            DebateStatus::InProgress => "in_progress",
            DebateStatus::Judging => "judging",
            DebateStatus::Finished => "finished",
            DebateStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Opening,
    Reply,
    Verdict,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Opening => "opening",
            RequestKind::Reply => "reply",
            RequestKind::Verdict => "verdict",
        }
    }
}

/// Identifies one outstanding dialogue request of one session incarnation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    session_id: Uuid,
    seq: u64,
    kind: RequestKind,
}

impl RequestTicket {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

/// A request the caller must send to the dialogue service, and the ticket to
/// resolve it with.
#[derive(Debug, Clone)]
pub struct PendingCall<R> {
    pub ticket: RequestTicket,
    pub request: R,
}

/// What happened to a service outcome handed to a `resolve_*` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    /// The ticket no longer matches the session; nothing was changed.
    Discarded,
}

/// Owner-supplied configuration. The engine reads tier and content only from here.
#[derive(Debug, Clone, Default)]
pub struct DebateConfig {
    pub tier: Tier,
    pub content: ContentRef,
    pub policy: EntitlementPolicy,
}

//=========================================================================================
// DebateSession
//=========================================================================================

#[derive(Debug, Clone)]
pub struct DebateSession {
    id: Uuid,
    config: DebateConfig,
    status: DebateStatus,
    difficulty: Difficulty,
    user_stance: Stance,
    /// Held while the opening is in flight; only enters the transcript with the reply.
    pending_thesis: Option<String>,
    ai_position: Option<String>,
    transcript: Vec<Turn>,
    verdict: Option<Verdict>,
    pending: Option<RequestTicket>,
    next_seq: u64,
    /// Where a failed judging request returns to.
    resume_status: DebateStatus,
    last_error: Option<String>,
}

impl DebateSession {
    pub fn new(config: DebateConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            status: DebateStatus::NotStarted,
            difficulty: Difficulty::default(),
            user_stance: Stance::default(),
            pending_thesis: None,
            ai_position: None,
            transcript: Vec::new(),
            verdict: None,
            pending: None,
            next_seq: 0,
            resume_status: DebateStatus::InProgress,
            last_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> DebateStatus {
        self.status
    }

    pub fn tier(&self) -> Tier {
        self.config.tier
    }

    pub fn content(&self) -> &ContentRef {
        &self.config.content
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn user_stance(&self) -> Stance {
        self.user_stance
    }

    pub fn pending_thesis(&self) -> Option<&str> {
        self.pending_thesis.as_deref()
    }

    pub fn ai_position(&self) -> Option<&str> {
        self.ai_position.as_deref()
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The debate topic is the user's opening thesis.
    pub fn topic(&self) -> Option<&str> {
        self.transcript
            .first()
            .map(|turn| turn.text.as_str())
            .or(self.pending_thesis.as_deref())
    }

    pub fn can_request_judging(&self) -> bool {
        !self.is_pending()
            && matches!(self.status, DebateStatus::InProgress | DebateStatus::Failed)
            && self.transcript.len() >= MIN_TURNS_FOR_JUDGING
    }

    //-------------------------------------------------------------------------------------
    // Setup
    //-------------------------------------------------------------------------------------

    pub fn select_difficulty(&mut self, difficulty: Difficulty) -> Result<(), SessionError> {
        self.ensure_not_started()?;
        self.ensure_difficulty_allowed(difficulty)?;
        self.difficulty = difficulty;
        Ok(())
    }

    /// Applies a subscription change. Entitlements are re-checked on the next
    /// command, so a downgrade takes effect without touching a running debate.
    pub fn set_tier(&mut self, tier: Tier) {
        self.config.tier = tier;
    }

    pub fn select_stance(&mut self, stance: Stance) -> Result<(), SessionError> {
        self.ensure_not_started()?;
        self.user_stance = stance;
        Ok(())
    }

    /// Discards the debate. Difficulty and stance survive; any in-flight reply is
    /// dropped on arrival because the session identity changes.
    pub fn reset(&mut self) {
        self.id = Uuid::new_v4();
        self.status = DebateStatus::NotStarted;
        self.pending_thesis = None;
        self.ai_position = None;
        self.transcript.clear();
        self.verdict = None;
        self.pending = None;
        self.resume_status = DebateStatus::InProgress;
        self.last_error = None;
    }

    //-------------------------------------------------------------------------------------
    // Opening
    //-------------------------------------------------------------------------------------

    pub fn submit_thesis(
        &mut self,
        thesis: &str,
    ) -> Result<PendingCall<OpeningRequest>, SessionError> {
        self.ensure_idle()?;
        if self.status != DebateStatus::NotStarted {
            return Err(ValidationError::InvalidState(self.status.as_str()).into());
        }
        let thesis = thesis.trim();
        if thesis.is_empty() {
            return Err(ValidationError::EmptyThesis.into());
        }
        let len = thesis.chars().count();
        if !(THESIS_MIN_CHARS..=THESIS_MAX_CHARS).contains(&len) {
            return Err(ValidationError::ThesisLength {
                min: THESIS_MIN_CHARS,
                max: THESIS_MAX_CHARS,
                actual: len,
            }
            .into());
        }
        self.ensure_difficulty_allowed(self.difficulty)?;

        let request = OpeningRequest {
            thesis: thesis.to_string(),
            user_stance: self.user_stance,
            difficulty: self.difficulty,
            content: self.config.content.clone(),
        };
        self.pending_thesis = Some(thesis.to_string());
        self.status = DebateStatus::AwaitingOpponent;
        let ticket = self.issue(RequestKind::Opening);
        Ok(PendingCall { ticket, request })
    }

    pub fn resolve_opening(
        &mut self,
        ticket: RequestTicket,
        outcome: PortResult<OpeningReply>,
    ) -> Result<Resolution, SessionError> {
        if !self.take_pending(ticket, RequestKind::Opening) {
            return Ok(Resolution::Discarded);
        }
        let Some(thesis) = self.pending_thesis.take() else {
            self.status = DebateStatus::NotStarted;
            return Err(ValidationError::InvalidState("awaiting_opponent").into());
        };
        let opening = outcome.map_err(SessionError::from).and_then(|reply| {
            let position = required_text("ai_position", reply.ai_position)?;
            let message = required_text("ai_message", reply.ai_message)?;
            Ok((position, message))
        });

        match opening {
            Ok((position, message)) => {
                self.ai_position = Some(position);
                self.transcript.push(Turn::user(thesis));
                self.transcript.push(Turn::ai(message));
                self.status = DebateStatus::InProgress;
                self.last_error = None;
                Ok(Resolution::Applied)
            }
            Err(err) => {
                self.status = DebateStatus::NotStarted;
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Turns
    //-------------------------------------------------------------------------------------

    pub fn submit_turn(
        &mut self,
        text: &str,
    ) -> Result<PendingCall<ContinuationRequest>, SessionError> {
        self.ensure_idle()?;
        if self.status != DebateStatus::InProgress {
            return Err(ValidationError::InvalidState(self.status.as_str()).into());
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyTurn.into());
        }
        if text.chars().count() > TURN_MAX_CHARS {
            return Err(ValidationError::TurnTooLong {
                max: TURN_MAX_CHARS,
            }
            .into());
        }

        let topic = self.require_topic()?;
        let ai_position = self.require_ai_position()?;
        self.transcript.push(Turn::user(text));
        Ok(self.continuation_call(topic, ai_position, text.to_string()))
    }

    /// Re-sends the unanswered user turn after a failed continuation.
    pub fn retry_turn(&mut self) -> Result<PendingCall<ContinuationRequest>, SessionError> {
        self.ensure_idle()?;
        if self.status != DebateStatus::Failed {
            return Err(ValidationError::InvalidState(self.status.as_str()).into());
        }
        let topic = self.require_topic()?;
        let ai_position = self.require_ai_position()?;
        let dangling = match self.transcript.last() {
            Some(turn) if turn.speaker == Speaker::User => turn.text.clone(),
            _ => return Err(ValidationError::InvalidState(self.status.as_str()).into()),
        };
        self.status = DebateStatus::InProgress;
        Ok(self.continuation_call(topic, ai_position, dangling))
    }

    pub fn resolve_reply(
        &mut self,
        ticket: RequestTicket,
        outcome: PortResult<ContinuationReply>,
    ) -> Result<Resolution, SessionError> {
        if !self.take_pending(ticket, RequestKind::Reply) {
            return Ok(Resolution::Discarded);
        }
        let reply = outcome
            .map_err(SessionError::from)
            .and_then(|reply| required_text("ai_message", reply.ai_message));

        match reply {
            Ok(message) => {
                self.transcript.push(Turn::ai(message));
                self.status = DebateStatus::InProgress;
                self.last_error = None;
                Ok(Resolution::Applied)
            }
            Err(err) => {
                // The user's turn was sent; retracting it would falsify the history.
                self.status = DebateStatus::Failed;
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Judging
    //-------------------------------------------------------------------------------------

    pub fn request_judging(&mut self) -> Result<PendingCall<JudgingRequest>, SessionError> {
        self.ensure_idle()?;
        if !matches!(self.status, DebateStatus::InProgress | DebateStatus::Failed) {
            return Err(ValidationError::InvalidState(self.status.as_str()).into());
        }
        if self.transcript.len() < MIN_TURNS_FOR_JUDGING {
            return Err(ValidationError::NeedMoreRounds.into());
        }

        let request = JudgingRequest {
            topic: self.require_topic()?,
            transcript: self.transcript.clone(),
        };
        self.resume_status = self.status;
        self.status = DebateStatus::Judging;
        let ticket = self.issue(RequestKind::Verdict);
        Ok(PendingCall { ticket, request })
    }

    pub fn resolve_verdict(
        &mut self,
        ticket: RequestTicket,
        outcome: PortResult<VerdictReply>,
    ) -> Result<Resolution, SessionError> {
        if !self.take_pending(ticket, RequestKind::Verdict) {
            return Ok(Resolution::Discarded);
        }

        match outcome.map_err(SessionError::from).and_then(validate_verdict) {
            Ok(verdict) => {
                self.verdict = Some(verdict);
                self.status = DebateStatus::Finished;
                self.last_error = None;
                Ok(Resolution::Applied)
            }
            Err(err) => {
                self.status = self.resume_status;
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Internals
    //-------------------------------------------------------------------------------------

    fn continuation_call(
        &mut self,
        topic: String,
        ai_position: String,
        new_user_message: String,
    ) -> PendingCall<ContinuationRequest> {
        let request = ContinuationRequest {
            topic,
            ai_position,
            difficulty: self.difficulty,
            transcript: self.transcript.clone(),
            new_user_message,
            content: self.config.content.clone(),
        };
        let ticket = self.issue(RequestKind::Reply);
        PendingCall { ticket, request }
    }

    fn issue(&mut self, kind: RequestKind) -> RequestTicket {
        self.next_seq += 1;
        let ticket = RequestTicket {
            session_id: self.id,
            seq: self.next_seq,
            kind,
        };
        self.pending = Some(ticket);
        ticket
    }

    fn require_topic(&self) -> Result<String, SessionError> {
        self.topic()
            .map(str::to_string)
            .ok_or_else(|| ValidationError::InvalidState(self.status.as_str()).into())
    }

    fn require_ai_position(&self) -> Result<String, SessionError> {
        self.ai_position
            .clone()
            .ok_or_else(|| ValidationError::InvalidState(self.status.as_str()).into())
    }

    /// Clears the pending request if `ticket` is it and was issued for `expected`.
    fn take_pending(&mut self, ticket: RequestTicket, expected: RequestKind) -> bool {
        if ticket.kind == expected && self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.is_pending() {
            return Err(ValidationError::RequestInFlight.into());
        }
        Ok(())
    }

    fn ensure_not_started(&self) -> Result<(), SessionError> {
        if self.status != DebateStatus::NotStarted || self.is_pending() {
            return Err(ValidationError::AlreadyStarted.into());
        }
        Ok(())
    }

    fn ensure_difficulty_allowed(&self, difficulty: Difficulty) -> Result<(), SessionError> {
        let tier = self.config.tier;
        if difficulty == Difficulty::Hard
            && !self.config.policy.can_use(tier, Capability::HardDifficulty)
        {
            return Err(SessionError::Entitlement {
                tier,
                capability: Capability::HardDifficulty,
            });
        }
        Ok(())
    }
}

fn required_text(field: &str, value: String) -> Result<String, SessionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SessionError::Data(format!("'{field}' is empty")));
    }
    Ok(trimmed.to_string())
}

fn score(field: &str, value: i64) -> Result<u8, SessionError> {
    u8::try_from(value)
        .ok()
        .filter(|score| *score <= MAX_SCORE)
        .ok_or_else(|| {
            SessionError::Data(format!("'{field}' must be within 0..={MAX_SCORE}, got {value}"))
        })
}

fn validate_verdict(reply: VerdictReply) -> Result<Verdict, SessionError> {
    Ok(Verdict {
        winner: reply.winner,
        user_score: score("user_score", reply.user_score)?,
        ai_score: score("ai_score", reply.ai_score)?,
        summary: required_text("summary", reply.summary)?,
        tip: reply.tip.trim().to_string(),
        user_strengths: reply.user_strengths,
        user_weaknesses: reply.user_weaknesses,
        ai_strengths: reply.ai_strengths,
        ai_weaknesses: reply.ai_weaknesses,
    })
}
