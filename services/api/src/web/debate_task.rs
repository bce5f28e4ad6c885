//! services/api/src/web/debate_task.rs
//!
//! Runs debate commands for one connection. Local commands are answered inline;
//! commands that need the dialogue service are validated under the session lock,
//! then the network call runs in a spawned task that resolves back into the session.

use crate::web::{
    protocol::{ClientMessage, DebateSnapshot, ServerMessage},
    state::AppState,
    traversal::{not_available, rejected},
    ws_handler::{send_message, WsSender},
};
use std::sync::Arc;
use study_session_core::{
    ports::{ContinuationRequest, JudgingRequest, OpeningRequest},
    DebateDialogueService, DebateSession, PendingCall, RequestTicket, Resolution, SessionError,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// A validated dialogue request waiting to be sent.
pub enum DialogueCall {
    Opening(PendingCall<OpeningRequest>),
    Reply(PendingCall<ContinuationRequest>),
    Verdict(PendingCall<JudgingRequest>),
}

impl DialogueCall {
    pub fn ticket(&self) -> RequestTicket {
        match self {
            DialogueCall::Opening(call) => call.ticket,
            DialogueCall::Reply(call) => call.ticket,
            DialogueCall::Verdict(call) => call.ticket,
        }
    }

    /// Sends the request and resolves the outcome into the session.
    ///
    /// The lock is only taken once the response is in, so the client can keep
    /// issuing local commands (or reset) while the request is outstanding.
    pub async fn execute(
        self,
        dialogue: &dyn DebateDialogueService,
        session_lock: &Mutex<DebateSession>,
    ) -> Result<Resolution, SessionError> {
        match self {
            DialogueCall::Opening(call) => {
                let outcome = dialogue.start_debate(&call.request).await;
                session_lock
                    .lock()
                    .await
                    .resolve_opening(call.ticket, outcome)
            }
            DialogueCall::Reply(call) => {
                let outcome = dialogue.continue_debate(&call.request).await;
                session_lock.lock().await.resolve_reply(call.ticket, outcome)
            }
            DialogueCall::Verdict(call) => {
                let outcome = dialogue.judge_debate(&call.request).await;
                session_lock
                    .lock()
                    .await
                    .resolve_verdict(call.ticket, outcome)
            }
        }
    }
}

/// Applies one client message to the connection's debate.
pub async fn handle_debate_message(
    msg: ClientMessage,
    app_state: &Arc<AppState>,
    session_lock: &Arc<Mutex<DebateSession>>,
    ws_sender: &WsSender,
    token: &CancellationToken,
) {
    let (reply, call) = {
        let mut session = session_lock.lock().await;
        let command = match msg {
            ClientMessage::ChangeTier { tier } => {
                info!("Debate {} now on the {:?} tier.", session.id(), tier);
                session.set_tier(tier.into());
                Ok(None)
            }
            ClientMessage::SelectDifficulty { difficulty } => session
                .select_difficulty(difficulty.into())
                .map(|_| None),
            ClientMessage::SelectStance { stance } => {
                session.select_stance(stance.into()).map(|_| None)
            }
            ClientMessage::ResetDebate => {
                info!("Resetting debate {}.", session.id());
                session.reset();
                Ok(None)
            }
            ClientMessage::SubmitThesis { text } => session
                .submit_thesis(&text)
                .map(|call| Some(DialogueCall::Opening(call))),
            ClientMessage::SubmitTurn { text } => session
                .submit_turn(&text)
                .map(|call| Some(DialogueCall::Reply(call))),
            ClientMessage::RetryTurn => session
                .retry_turn()
                .map(|call| Some(DialogueCall::Reply(call))),
            ClientMessage::EndDebate => session
                .request_judging()
                .map(|call| Some(DialogueCall::Verdict(call))),
            other => {
                drop(session);
                let reply = not_available(&other, "debate");
                if let Err(e) = send_message(ws_sender, &reply).await {
                    error!("Failed to send rejection: {:?}", e);
                }
                return;
            }
        };

        match command {
            Ok(call) => (
                ServerMessage::DebateState(DebateSnapshot::from(&*session)),
                call,
            ),
            Err(e) => {
                info!("Debate command rejected: {}", e);
                (rejected(e), None)
            }
        }
    };

    if let Err(e) = send_message(ws_sender, &reply).await {
        error!("Failed to send debate update: {:?}", e);
        return;
    }

    if let Some(call) = call {
        tokio::spawn(dialogue_process(
            app_state.dialogue.clone(),
            session_lock.clone(),
            ws_sender.clone(),
            token.clone(),
            call,
        ));
    }
}

/// Sends the request and resolves it, unless the token fires first. Returns
/// `None` when cancelled; the session is then left untouched.
pub async fn run_dialogue(
    dialogue: &dyn DebateDialogueService,
    session_lock: &Mutex<DebateSession>,
    token: &CancellationToken,
    call: DialogueCall,
) -> Option<Result<Resolution, SessionError>> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        result = call.execute(dialogue, session_lock) => Some(result),
    }
}

/// Drives one dialogue request to completion unless the connection goes away first.
async fn dialogue_process(
    dialogue: Arc<dyn DebateDialogueService>,
    session_lock: Arc<Mutex<DebateSession>>,
    ws_sender: WsSender,
    token: CancellationToken,
    call: DialogueCall,
) {
    let ticket = call.ticket();
    let label = ticket.kind().as_str();
    info!("Dialogue {} request started.", label);

    let Some(result) = run_dialogue(dialogue.as_ref(), &session_lock, &token, call).await else {
        info!("Dialogue {} request cancelled.", label);
        return;
    };

    match result {
        Ok(Resolution::Applied) => info!("Dialogue {} request applied.", label),
        Ok(Resolution::Discarded) => {
            info!(
                "Discarding stale dialogue {} response for debate {}.",
                label,
                ticket.session_id()
            );
            return;
        }
        Err(e) => {
            warn!("Dialogue {} request failed: {}", label, e);
            let msg = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Err(e) = send_message(&ws_sender, &msg).await {
                error!("Failed to send dialogue error: {:?}", e);
                return;
            }
        }
    }

    let snapshot = DebateSnapshot::from(&*session_lock.lock().await);
    if let Err(e) = send_message(&ws_sender, &ServerMessage::DebateState(snapshot)).await {
        error!("Failed to send debate update: {:?}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use study_session_core::{
        ports::{ContinuationReply, OpeningReply, PortError, PortResult, VerdictReply},
        DebateConfig, DebateStatus,
    };

    struct CannedDialogue;

    #[async_trait]
    impl DebateDialogueService for CannedDialogue {
        async fn start_debate(&self, _request: &OpeningRequest) -> PortResult<OpeningReply> {
            Ok(OpeningReply {
                ai_position: "against".to_string(),
                ai_message: "I disagree.".to_string(),
            })
        }

        async fn continue_debate(
            &self,
            _request: &ContinuationRequest,
        ) -> PortResult<ContinuationReply> {
            Err(PortError::Transport("connection reset".to_string()))
        }

        async fn judge_debate(&self, _request: &JudgingRequest) -> PortResult<VerdictReply> {
            Err(PortError::MalformedResponse("not json".to_string()))
        }
    }

    #[tokio::test]
    async fn opening_call_resolves_into_the_session() {
        let lock = Mutex::new(DebateSession::new(DebateConfig::default()));
        let call = lock.lock().await.submit_thesis("Homework helps").unwrap();

        let resolution = DialogueCall::Opening(call)
            .execute(&CannedDialogue, &lock)
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::Applied);
        let session = lock.lock().await;
        assert_eq!(session.status(), DebateStatus::InProgress);
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn reset_while_in_flight_discards_the_response() {
        let lock = Mutex::new(DebateSession::new(DebateConfig::default()));
        let call = lock.lock().await.submit_thesis("Homework helps").unwrap();
        lock.lock().await.reset();

        let resolution = DialogueCall::Opening(call)
            .execute(&CannedDialogue, &lock)
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::Discarded);
        let session = lock.lock().await;
        assert_eq!(session.status(), DebateStatus::NotStarted);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn cancelled_connection_leaves_the_session_untouched() {
        let lock = Mutex::new(DebateSession::new(DebateConfig::default()));
        let call = lock.lock().await.submit_thesis("Homework helps").unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = run_dialogue(&CannedDialogue, &lock, &token, DialogueCall::Opening(call)).await;

        assert!(outcome.is_none());
        let session = lock.lock().await;
        assert!(session.is_pending());
        assert_eq!(session.status(), DebateStatus::AwaitingOpponent);
        assert_eq!(session.pending_thesis(), Some("Homework helps"));
        assert!(session.transcript().is_empty());
        assert!(session.ai_position().is_none());
    }

    #[tokio::test]
    async fn live_connection_resolves_the_call() {
        let lock = Mutex::new(DebateSession::new(DebateConfig::default()));
        let call = lock.lock().await.submit_thesis("Homework helps").unwrap();
        let token = CancellationToken::new();

        let outcome = run_dialogue(&CannedDialogue, &lock, &token, DialogueCall::Opening(call)).await;

        assert_eq!(outcome, Some(Ok(Resolution::Applied)));
        assert_eq!(lock.lock().await.ai_position(), Some("against"));
    }

    #[tokio::test]
    async fn failed_reply_leaves_the_session_retryable() {
        let lock = Mutex::new(DebateSession::new(DebateConfig::default()));
        let call = lock.lock().await.submit_thesis("Homework helps").unwrap();
        DialogueCall::Opening(call)
            .execute(&CannedDialogue, &lock)
            .await
            .unwrap();

        let call = lock.lock().await.submit_turn("It builds habits").unwrap();
        let err = DialogueCall::Reply(call)
            .execute(&CannedDialogue, &lock)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Transport(_)));
        let session = lock.lock().await;
        assert_eq!(session.status(), DebateStatus::Failed);
        assert_eq!(session.transcript().len(), 3);
    }
}
