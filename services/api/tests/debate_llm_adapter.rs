use std::sync::Arc;

use api_lib::adapters::OpenAiDebateAdapter;
use async_openai::{config::OpenAIConfig, Client};
use serde_json::json;
use study_session_core::{
    ports::{ContinuationRequest, DebateDialogueService, OpeningRequest, PortError},
    ContentRef, DebateConfig, DebateEngine, DebateStatus, Difficulty, SessionError, Stance, Tier,
    Turn, Winner,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEBATE_MODEL: &str = "debate-test-model";
const JUDGE_MODEL: &str = "judge-test-model";

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": DEBATE_MODEL,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop",
            "logprobs": null
        }]
    }))
}

fn adapter(server: &MockServer) -> OpenAiDebateAdapter {
    let config = OpenAIConfig::new()
        .with_api_key("test-key")
        .with_api_base(server.uri());
    OpenAiDebateAdapter::new(
        Client::with_config(config),
        DEBATE_MODEL.to_string(),
        JUDGE_MODEL.to_string(),
    )
}

fn opening(stance: Stance) -> OpeningRequest {
    OpeningRequest {
        thesis: "School uniforms should be mandatory".to_string(),
        user_stance: stance,
        difficulty: Difficulty::Medium,
        content: ContentRef {
            material_id: None,
            title: Some("Dress codes".to_string()),
            context: Some("Uniforms reduce visible income differences.".to_string()),
        },
    }
}

#[tokio::test]
async fn opening_takes_the_opposite_stance_and_quotes_the_material() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("YOUR POSITION: against"))
        .and(body_string_contains("Uniforms reduce visible income differences."))
        .respond_with(completion("Uniforms stifle self-expression."))
        .expect(1)
        .mount(&server)
        .await;

    let reply = adapter(&server)
        .start_debate(&opening(Stance::For))
        .await
        .unwrap();

    assert_eq!(reply.ai_position, "against");
    assert_eq!(reply.ai_message, "Uniforms stifle self-expression.");
}

#[tokio::test]
async fn fenced_judge_reply_is_parsed() {
    let server = MockServer::start().await;
    let verdict = r#"```json
{"winner":"draw","user_score":6,"ai_score":6,"summary":"Even.","tip":"Cite sources.",
 "user_strengths":["clear"],"user_weaknesses":[],"ai_strengths":[],"ai_weaknesses":["vague"]}
```"#;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(JUDGE_MODEL))
        .respond_with(completion(verdict))
        .mount(&server)
        .await;

    let request = study_session_core::ports::JudgingRequest {
        topic: "School uniforms should be mandatory".to_string(),
        transcript: Vec::new(),
    };
    let reply = adapter(&server).judge_debate(&request).await.unwrap();

    assert_eq!(reply.winner, Winner::Draw);
    assert_eq!(reply.user_score, 6);
    assert_eq!(reply.ai_weaknesses, vec!["vague".to_string()]);
}

#[tokio::test]
async fn judge_prose_is_a_malformed_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("I think the user won, roughly 7 to 5."))
        .mount(&server)
        .await;

    let request = study_session_core::ports::JudgingRequest {
        topic: "Anything".to_string(),
        transcript: Vec::new(),
    };
    let err = adapter(&server).judge_debate(&request).await.unwrap_err();
    assert!(matches!(err, PortError::MalformedResponse(_)));
}

#[tokio::test]
async fn rejected_request_is_a_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "bad request",
                "type": "invalid_request_error",
                "param": null,
                "code": null
            }
        })))
        .mount(&server)
        .await;

    let err = adapter(&server)
        .start_debate(&opening(Stance::Against))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Transport(_)));
}

#[tokio::test]
async fn engine_runs_a_full_debate_against_the_adapter() {
    let server = MockServer::start().await;

    // Mounted first so judge calls never fall through to the opponent mock.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(JUDGE_MODEL))
        .respond_with(completion(
            r#"{"winner":"user","user_score":8,"ai_score":6,"summary":"User was sharper.","tip":"Keep it up."}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(DEBATE_MODEL))
        .respond_with(completion("That ignores the cost to families."))
        .expect(2)
        .mount(&server)
        .await;

    let config = DebateConfig {
        tier: Tier::Pro,
        ..DebateConfig::default()
    };
    let mut engine = DebateEngine::new(config, Arc::new(adapter(&server)));
    engine.select_difficulty(Difficulty::Hard).unwrap();

    engine
        .submit_thesis("School uniforms should be mandatory")
        .await
        .unwrap();
    engine.submit_turn("They save money over time.").await.unwrap();
    let session = engine.end_debate().await.unwrap();

    assert_eq!(session.status(), DebateStatus::Finished);
    assert_eq!(session.transcript().len(), 4);
    let verdict = session.verdict().unwrap();
    assert_eq!(verdict.winner, Winner::User);
    assert_eq!((verdict.user_score, verdict.ai_score), (8, 6));
}

#[tokio::test]
async fn out_of_range_score_from_the_judge_keeps_the_debate_open() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(JUDGE_MODEL))
        .respond_with(completion(
            r#"{"winner":"ai","user_score":4,"ai_score":11,"summary":"Too generous."}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("A counterpoint."))
        .mount(&server)
        .await;

    let mut engine = DebateEngine::new(DebateConfig::default(), Arc::new(adapter(&server)));
    engine.submit_thesis("Homework should be banned").await.unwrap();
    engine.submit_turn("It crowds out sleep.").await.unwrap();

    let err = engine.end_debate().await.unwrap_err();
    assert!(matches!(err, SessionError::Data(_)));
    assert_eq!(engine.session().status(), DebateStatus::InProgress);
    assert!(engine.session().verdict().is_none());
}

#[tokio::test]
async fn continuation_history_window_includes_the_new_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("Noted."))
        .mount(&server)
        .await;

    // Eleven entries: five full rounds plus the new user turn.
    let mut transcript: Vec<Turn> = (0..10)
        .map(|i| {
            if i % 2 == 0 {
                Turn::user(format!("user-point-{i}"))
            } else {
                Turn::ai(format!("ai-point-{i}"))
            }
        })
        .collect();
    transcript.push(Turn::user("user-point-10"));

    let request = ContinuationRequest {
        topic: "Cities should ban cars".to_string(),
        ai_position: "against".to_string(),
        difficulty: Difficulty::Easy,
        transcript,
        new_user_message: "user-point-10".to_string(),
        content: ContentRef::default(),
    };
    let adapter = adapter(&server).with_limits(5000, 10);
    adapter.continue_debate(&request).await.unwrap();

    let received = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&received[0].body).to_string();
    assert!(!body.contains("user-point-0"));
    assert!(body.contains("ai-point-1"));
    assert!(body.contains("Opponent: user-point-10"));
}
