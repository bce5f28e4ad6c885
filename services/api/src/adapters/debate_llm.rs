//! services/api/src/adapters/debate_llm.rs
//!
//! This module contains the adapter for the debate opponent and judge LLMs.
//! It implements the `DebateDialogueService` port from the `core` crate.

const EASY_OPPONENT: &str = r#"You are a beginner debater.
- Make simple arguments.
- Concede readily when you meet a good counterargument.
- Occasionally make a logical slip the user could spot.
- Stay polite and constructive."#;

const MEDIUM_OPPONENT: &str = r#"You are an experienced debater.
- Make convincing arguments backed by examples.
- Find the weak points in your opponent's reasoning.
- Use rhetorical techniques.
- Ask for evidence and clarification.
- Acknowledge strong arguments, but look for counterarguments."#;

const HARD_OPPONENT: &str = r#"You are a professional debater and subject-matter expert.
- Use rigorous logical structure.
- Apply the Socratic method: ask leading questions.
- Name logical fallacies in your opponent's arguments.
- Cite statistics, studies and expert opinion.
- Switch tactics between attack and defence.
- Do not give in easily, but concede if the arguments are irrefutable."#;

const DEBATE_RULES: &str = r#"DEBATE RULES:
1. Answer briefly: 2-4 sentences at most.
2. Every answer must contain a response to your opponent's argument (if there is one) and a new argument or question of your own.
3. Never repeat an argument you have already made.
4. You may end your answer with a question for your opponent.

ANSWER FORMAT:
Only the text of your argument, with no extra commentary."#;

const JUDGE_INSTRUCTIONS: &str = r#"You are an impartial debate judge.

Score the debate on:
1. Quality of arguments (who gave more convincing reasons)
2. Logic (who was more consistent)
3. Rebuttals (who answered counterarguments better)
4. Rhetoric (who was more persuasive)

Participant 1 is the user, participant 2 is the AI.

Respond with ONLY this JSON object:
{
    "winner": "user" or "ai" or "draw",
    "user_score": integer from 1 to 10,
    "ai_score": integer from 1 to 10,
    "user_strengths": ["..."],
    "user_weaknesses": ["..."],
    "ai_strengths": ["..."],
    "ai_weaknesses": ["..."],
    "summary": "2-3 sentence summary of the debate",
    "tip": "one piece of advice for the user to improve their debating"
}"#;

use std::sync::OnceLock;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use study_session_core::{
    domain::{ContentRef, Difficulty, Speaker, Turn, Winner},
    ports::{
        ContinuationReply, ContinuationRequest, DebateDialogueService, JudgingRequest,
        OpeningReply, OpeningRequest, PortError, PortResult, VerdictReply,
    },
};
use tracing::{debug, info};

pub const DEFAULT_MATERIAL_CONTEXT_CHARS: usize = 5000;
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `DebateDialogueService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiDebateAdapter {
    client: Client<OpenAIConfig>,
    debate_model: String,
    judge_model: String,
    material_context_chars: usize,
    history_window: usize,
}

impl OpenAiDebateAdapter {
    /// Creates a new `OpenAiDebateAdapter`.
    pub fn new(client: Client<OpenAIConfig>, debate_model: String, judge_model: String) -> Self {
        Self {
            client,
            debate_model,
            judge_model,
            material_context_chars: DEFAULT_MATERIAL_CONTEXT_CHARS,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_limits(mut self, material_context_chars: usize, history_window: usize) -> Self {
        self.material_context_chars = material_context_chars;
        self.history_window = history_window;
        self
    }

    fn system_prompt(
        &self,
        topic: &str,
        position: &str,
        difficulty: Difficulty,
        content: &ContentRef,
    ) -> String {
        let persona = match difficulty {
            Difficulty::Easy => EASY_OPPONENT,
            Difficulty::Medium => MEDIUM_OPPONENT,
            Difficulty::Hard => HARD_OPPONENT,
        };

        let mut prompt = format!(
            "You are taking part in a debate on the thesis: \"{topic}\"\n\nYOUR POSITION: {position}\n\n{persona}\n\n{DEBATE_RULES}"
        );
        if let Some(context) = content.context.as_deref().filter(|c| !c.trim().is_empty()) {
            let excerpt: String = context.chars().take(self.material_context_chars).collect();
            prompt.push_str(&format!(
                "\n\nMATERIAL CONTEXT:\n{excerpt}\n\nUse facts from this material to strengthen your arguments."
            ));
        }
        prompt
    }

    /// Sends one system + user exchange and returns the text of the first choice.
    async fn complete(&self, model: &str, system: &str, user: String) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| PortError::Transport(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| PortError::Transport(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Transport(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Transport(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                PortError::MalformedResponse("LLM returned no choices in its response.".to_string())
            })?
            .message
            .content
            .ok_or_else(|| {
                PortError::MalformedResponse("LLM response contained no text content.".to_string())
            })?;

        Ok(content.trim().to_string())
    }
}

//=========================================================================================
// `DebateDialogueService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DebateDialogueService for OpenAiDebateAdapter {
    /// The opponent takes the stance opposite to the user's and opens the debate.
    async fn start_debate(&self, request: &OpeningRequest) -> PortResult<OpeningReply> {
        let ai_position = request.user_stance.opposite().label();
        let system = self.system_prompt(
            &request.thesis,
            ai_position,
            request.difficulty,
            &request.content,
        );
        let user = format!(
            "Open the debate. State your position and give your first argument {ai_position} the thesis \"{}\".",
            request.thesis
        );

        let ai_message = self.complete(&self.debate_model, &system, user).await?;
        info!("Debate opened ({:?}), AI argues {}", request.difficulty, ai_position);

        Ok(OpeningReply {
            ai_position: ai_position.to_string(),
            ai_message,
        })
    }

    async fn continue_debate(
        &self,
        request: &ContinuationRequest,
    ) -> PortResult<ContinuationReply> {
        let system = self.system_prompt(
            &request.topic,
            &request.ai_position,
            request.difficulty,
            &request.content,
        );
        // The window counts the new message too; it is also quoted on its own below.
        let user = format!(
            "DEBATE HISTORY:\n{}\nYour opponent just said: \"{}\"\n\nRespond to this argument and continue the debate.",
            history_excerpt(&request.transcript, self.history_window),
            request.new_user_message
        );

        let ai_message = self.complete(&self.debate_model, &system, user).await?;
        debug!("Debate continued at turn {}", request.transcript.len() / 2 + 1);
        Ok(ContinuationReply { ai_message })
    }

    async fn judge_debate(&self, request: &JudgingRequest) -> PortResult<VerdictReply> {
        let user = format!(
            "THESIS: {}\n\nDEBATE:\n{}",
            request.topic,
            judge_transcript(&request.transcript)
        );
        let raw = self.complete(&self.judge_model, JUDGE_INSTRUCTIONS, user).await?;
        let verdict = parse_verdict(&raw)?;
        info!(
            "Debate judged: winner {:?}, {}:{}",
            verdict.winner, verdict.user_score, verdict.ai_score
        );
        Ok(verdict)
    }
}

//=========================================================================================
// Prompt and Response Helpers
//=========================================================================================

/// Formats the last `window` turns from the opponent's point of view.
pub fn history_excerpt(transcript: &[Turn], window: usize) -> String {
    let start = transcript.len().saturating_sub(window);
    transcript[start..]
        .iter()
        .map(|turn| {
            let role = match turn.speaker {
                Speaker::User => "Opponent",
                Speaker::Ai => "You",
            };
            format!("{role}: {}\n\n", turn.text)
        })
        .collect()
}

fn judge_transcript(transcript: &[Turn]) -> String {
    transcript
        .iter()
        .map(|turn| {
            let role = match turn.speaker {
                Speaker::User => "Participant 1",
                Speaker::Ai => "Participant 2 (AI)",
            };
            format!("{role}: {}\n\n", turn.text)
        })
        .collect()
}

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("fence pattern is valid")
    })
}

/// The judge's JSON exactly as it must appear on the wire.
#[derive(Deserialize)]
struct JudgeRecord {
    winner: String,
    user_score: i64,
    ai_score: i64,
    summary: String,
    #[serde(default)]
    tip: String,
    #[serde(default)]
    user_strengths: Vec<String>,
    #[serde(default)]
    user_weaknesses: Vec<String>,
    #[serde(default)]
    ai_strengths: Vec<String>,
    #[serde(default)]
    ai_weaknesses: Vec<String>,
}

/// Parses the judge's reply, tolerating a Markdown code fence around the JSON.
pub fn parse_verdict(raw: &str) -> PortResult<VerdictReply> {
    let json = code_fence()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw.trim(), |m| m.as_str());

    let record: JudgeRecord = serde_json::from_str(json)
        .map_err(|e| PortError::MalformedResponse(format!("judge reply is not valid JSON: {e}")))?;

    let winner = match record.winner.trim().to_ascii_lowercase().as_str() {
        "user" => Winner::User,
        "ai" => Winner::Ai,
        "draw" => Winner::Draw,
        other => {
            return Err(PortError::MalformedResponse(format!(
                "unknown winner '{other}'"
            )))
        }
    };

    Ok(VerdictReply {
        winner,
        user_score: record.user_score,
        ai_score: record.ai_score,
        summary: record.summary,
        tip: record.tip,
        user_strengths: record.user_strengths,
        user_weaknesses: record.user_weaknesses,
        ai_strengths: record.ai_strengths,
        ai_weaknesses: record.ai_weaknesses,
    })
}
