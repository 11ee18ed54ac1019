//! Common test utilities: a mock chat-completions endpoint and ready-made state.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use flashcard_tutor::config::TutorConfig;
use flashcard_tutor::generator::Generator;
use flashcard_tutor::openai::OpenAI;
use flashcard_tutor::routes::build_router;
use flashcard_tutor::state::AppState;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const NOTES: &str = "Photosynthesis is the process by which plants convert light energy into chemical energy. \
The mitochondria are the powerhouse of the cell. Human cells contain 46 chromosomes arranged in 23 pairs. \
Ribosomes build proteins by reading messenger RNA.";

/// Start a new mock server for testing.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// OpenAI client pointed at the mock server.
pub fn openai_for_mock(server: &MockServer, timeout: Duration) -> OpenAI {
    OpenAI::new("sk-test", format!("{}/v1", server.uri()), "gpt-test", timeout).unwrap()
}

/// Generator using default prompts and limits around the mock client.
pub fn generator_for_mock(server: &MockServer, timeout: Duration) -> Generator<OpenAI> {
    let config = TutorConfig::default();
    Generator::new(Some(openai_for_mock(server, timeout)), config.prompts, config.limits)
}

/// A successful chat-completions envelope carrying `content`.
pub fn chat_response(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
        ],
        "usage": { "prompt_tokens": 120, "completion_tokens": 80, "total_tokens": 200 }
    }))
}

/// Mount a chat-completions mock (expect exactly 1 call).
pub async fn mock_chat(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

/// Router over an offline generator.
#[allow(dead_code)]
pub fn offline_app() -> Router {
    let config = TutorConfig::default();
    let generator = Generator::offline(config.prompts.clone(), config.limits.clone());
    build_router(Arc::new(AppState::with_generator(config, generator)))
}

/// Router whose generator talks to the mock server.
#[allow(dead_code)]
pub fn mock_app(server: &MockServer) -> Router {
    let generator = generator_for_mock(server, Duration::from_secs(5));
    build_router(Arc::new(AppState::with_generator(TutorConfig::default(), generator)))
}

/// `n` valid Q/A card objects as a JSON array string.
#[allow(dead_code)]
pub fn cards_json(n: usize) -> String {
    let items: Vec<_> = (1..=n)
        .map(|i| json!({ "type": "qa", "difficulty": "medium", "question": format!("Q{i}"), "answer": format!("A{i}") }))
        .collect();
    serde_json::Value::Array(items).to_string()
}
