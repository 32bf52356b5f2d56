//! OpenAI-compatible client against a local mock server.

use scrivener::agents::AgentRole;
use scrivener::llm::openai::OpenAIClient;
use scrivener::llm::LLMClient;
use scrivener::types::{AppError, ErrorKind};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, timeout: Duration) -> OpenAIClient {
    OpenAIClient::new(
        "test-key".to_string(),
        format!("{}/v1/", server.uri()),
        "gpt-4o-mini".to_string(),
        timeout,
    )
    .unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn test_generate_with_system_sends_both_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                { "role": "system", "content": "be brief" },
                { "role": "user", "content": "hello" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server, Duration::from_secs(5))
        .generate_with_system("be brief", "hello")
        .await
        .unwrap();

    assert_eq!(reply, "hi there");
}

#[tokio::test]
async fn test_complete_uses_role_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [{ "role": "system", "content": AgentRole::Planner.system_prompt() }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"queries\": []}")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server, Duration::from_secs(5))
        .complete(AgentRole::Planner, "plan", None)
        .await
        .unwrap();

    assert_eq!(reply, "{\"queries\": []}");
}

#[tokio::test]
async fn test_api_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "param": null,
                "code": "invalid_api_key"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .generate("hello")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::LLM(_)));
    assert!(err.to_string().contains("Incorrect API key provided"));
}

#[tokio::test]
async fn test_empty_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-2",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o-mini",
            "choices": []
        })))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .generate("hello")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Provider);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_millis(300))
        .generate("hello")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProviderTimeout);
}
