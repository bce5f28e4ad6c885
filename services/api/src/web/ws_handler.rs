//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! The first message decides which study session the connection owns; every
//! later message is dispatched to that session.

use crate::{
    error::ApiError,
    web::{
        debate_task::handle_debate_message,
        protocol::{
            cards_to_domain, content_ref, questions_to_domain, ClientMessage, ServerMessage,
            SessionKind,
        },
        state::{ActiveSession, AppState, ConnectionState},
        traversal::{apply_flashcard_message, apply_quiz_message},
    },
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use study_session_core::{
    DebateConfig, DebateSession, FlashcardSession, QuizSession, SessionError, ValidationError,
};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// The sending half of a socket, shared between the control loop and dialogue tasks.
pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Serializes a message and sends it as a text frame.
pub async fn send_message(ws_sender: &WsSender, msg: &ServerMessage) -> Result<(), ApiError> {
    let json = serde_json::to_string(msg)?;
    ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await?;
    Ok(())
}

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // --- 1. Initialization Phase ---
    let Some(mut connection) = initialize(&mut receiver, &app_state, &ws_sender).await else {
        return;
    };

    // --- 2. Main Message Loop ---
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                handle_text_message(text.as_str(), &app_state, &mut connection, &ws_sender).await;
            }
            Ok(Message::Close(_)) => {
                info!("Client sent close message.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    // --- 3. Cleanup ---
    // Outstanding dialogue requests are abandoned; their responses are never applied.
    connection.cancellation_token.cancel();
    info!("WebSocket connection closed.");
}

/// Reads the first message and builds the session it asks for.
async fn initialize(
    receiver: &mut SplitStream<WebSocket>,
    app_state: &Arc<AppState>,
    ws_sender: &WsSender,
) -> Option<ConnectionState> {
    let init_json = match receiver.next().await {
        Some(Ok(Message::Text(text))) => text,
        _ => {
            error!("Client disconnected before sending an init message.");
            return None;
        }
    };

    let created = match serde_json::from_str::<ClientMessage>(init_json.as_str()) {
        Ok(msg) if msg.is_init() => create_session(msg, app_state),
        Ok(msg) => {
            error!("First message was not an init message: {:?}", msg);
            Err(ValidationError::InvalidState("uninitialized").into())
        }
        Err(e) => {
            error!("Failed to deserialize init message: {}", e);
            Err(SessionError::Data(e.to_string()))
        }
    };

    let (kind, session) = match created {
        Ok(created) => created,
        Err(e) => {
            let msg = init_failure(e);
            if let Err(e) = send_message(ws_sender, &msg).await {
                error!("Failed to send init error: {:?}", e);
            }
            return None;
        }
    };

    info!("Initialized {:?} session.", kind);
    let connection = ConnectionState::new(session);
    let snapshot = snapshot(&connection.session).await;
    for msg in [ServerMessage::SessionInitialized { kind }, snapshot] {
        if let Err(e) = send_message(ws_sender, &msg).await {
            error!("Failed to send session initialized message: {:?}", e);
            return None;
        }
    }
    Some(connection)
}

/// Content the client got wrong is a rejection; anything else is an error.
fn init_failure(err: SessionError) -> ServerMessage {
    if err.is_rejection() {
        ServerMessage::Rejected {
            reason: format!("cannot initialize session: {err}"),
        }
    } else {
        ServerMessage::Error {
            message: format!("Failed to initialize session: {err}"),
        }
    }
}

fn create_session(
    msg: ClientMessage,
    app_state: &AppState,
) -> Result<(SessionKind, ActiveSession), SessionError> {
    match msg {
        ClientMessage::InitDebate {
            tier,
            material_id,
            material_title,
            material_context,
        } => {
            let config = DebateConfig {
                tier: tier.into(),
                content: content_ref(material_id, material_title, material_context),
                policy: app_state.policy.clone(),
            };
            let session = DebateSession::new(config);
            Ok((
                SessionKind::Debate,
                ActiveSession::Debate(Arc::new(Mutex::new(session))),
            ))
        }
        ClientMessage::InitQuiz { questions } => {
            let quiz = QuizSession::new(questions_to_domain(questions))?;
            Ok((SessionKind::Quiz, ActiveSession::Quiz(quiz)))
        }
        ClientMessage::InitFlashcards { cards } => {
            let deck = FlashcardSession::new(cards_to_domain(cards))?;
            Ok((SessionKind::Flashcards, ActiveSession::Flashcards(deck)))
        }
        other => Err(SessionError::Data(format!("not an init message: {other:?}"))),
    }
}

async fn snapshot(session: &ActiveSession) -> ServerMessage {
    match session {
        ActiveSession::Debate(lock) => ServerMessage::DebateState((&*lock.lock().await).into()),
        ActiveSession::Quiz(quiz) => ServerMessage::QuizState(quiz.into()),
        ActiveSession::Flashcards(deck) => ServerMessage::FlashcardState(deck.into()),
    }
}

/// Helper function to route one text frame to the connection's session.
async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    connection: &mut ConnectionState,
    ws_sender: &WsSender,
) {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            let reply = ServerMessage::Rejected {
                reason: format!("unreadable message: {e}"),
            };
            if let Err(e) = send_message(ws_sender, &reply).await {
                error!("Failed to send rejection: {:?}", e);
            }
            return;
        }
    };

    if client_msg.is_init() {
        warn!("Received subsequent init message, which is ignored.");
        let reply = ServerMessage::Rejected {
            reason: "session already initialized".to_string(),
        };
        if let Err(e) = send_message(ws_sender, &reply).await {
            error!("Failed to send rejection: {:?}", e);
        }
        return;
    }

    let reply = match &mut connection.session {
        ActiveSession::Debate(session_lock) => {
            handle_debate_message(
                client_msg,
                app_state,
                session_lock,
                ws_sender,
                &connection.cancellation_token,
            )
            .await;
            return;
        }
        ActiveSession::Quiz(quiz) => apply_quiz_message(quiz, client_msg),
        ActiveSession::Flashcards(deck) => apply_flashcard_message(deck, client_msg),
    };

    if let Err(e) = send_message(ws_sender, &reply).await {
        error!("Failed to send session update: {:?}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use study_session_core::{
        ports::{
            ContinuationReply, ContinuationRequest, JudgingRequest, OpeningReply,
            OpeningRequest, VerdictReply,
        },
        DebateDialogueService, EntitlementPolicy, PortError, PortResult,
    };

    struct Offline;

    #[async_trait]
    impl DebateDialogueService for Offline {
        async fn start_debate(&self, _request: &OpeningRequest) -> PortResult<OpeningReply> {
            Err(PortError::Transport("offline".into()))
        }

        async fn continue_debate(
            &self,
            _request: &ContinuationRequest,
        ) -> PortResult<ContinuationReply> {
            Err(PortError::Transport("offline".into()))
        }

        async fn judge_debate(&self, _request: &JudgingRequest) -> PortResult<VerdictReply> {
            Err(PortError::Transport("offline".into()))
        }
    }

    fn init(raw: &str) -> Result<(SessionKind, ActiveSession), SessionError> {
        let state = AppState {
            dialogue: Arc::new(Offline),
            policy: EntitlementPolicy::default(),
        };
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        create_session(msg, &state)
    }

    fn init_reply(raw: &str) -> ServerMessage {
        match init(raw) {
            Ok(_) => panic!("expected init to fail"),
            Err(e) => init_failure(e),
        }
    }

    #[test]
    fn empty_quiz_init_is_rejected_not_an_error() {
        let reply = init_reply(r#"{"type":"init_quiz","questions":[]}"#);
        assert!(matches!(reply, ServerMessage::Rejected { .. }));
    }

    #[test]
    fn quiz_with_unknown_correct_label_is_rejected() {
        let reply = init_reply(
            r#"{"type":"init_quiz","questions":[{"question":"2+2?","options":{"A":"4"},"correct":"Z"}]}"#,
        );
        assert!(matches!(reply, ServerMessage::Rejected { .. }));
    }

    #[test]
    fn unreadable_init_is_an_error() {
        let reply = init_failure(SessionError::Data("expected value".into()));
        assert!(matches!(reply, ServerMessage::Error { .. }));
    }

    #[test]
    fn debate_init_builds_a_fresh_session() {
        let Ok((kind, ActiveSession::Debate(_))) = init(r#"{"type":"init_debate","tier":"sos"}"#)
        else {
            panic!("expected a debate session");
        };
        assert_eq!(kind, SessionKind::Debate);
    }
}
