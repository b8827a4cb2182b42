//! Tests for [`HttpCompletionProvider`] against a wiremock server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use heimdall::{
    CompletionProvider, CompletionRequest, FinishReason, GatewayError, HttpCompletionProvider,
    Message,
};

fn request() -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::user("What is 2 + 2?")],
        system_prompt: Some("You are a tutor.".into()),
        model: "gpt-4o-mini".into(),
        temperature: 0.7,
        max_tokens: 128,
    }
}

fn completion_body() -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "model": "gpt-4o-mini-2024",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": "2 + 2 = 4." },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 21, "completion_tokens": 8, "total_tokens": 29 }
    })
}

#[tokio::test]
async fn parses_a_successful_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .mount(&server)
        .await;

    let provider = HttpCompletionProvider::with_base_url("sk-test", server.uri());
    let completion = provider.complete(&request()).await.unwrap();

    assert_eq!(completion.content, "2 + 2 = 4.");
    assert_eq!(completion.model, "gpt-4o-mini-2024");
    assert_eq!(completion.prompt_tokens, 21);
    assert_eq!(completion.completion_tokens, 8);
    assert_eq!(completion.total_tokens, 29);
    assert_eq!(completion.finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn sends_system_prompt_as_first_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                { "role": "system", "content": "You are a tutor." },
                { "role": "user", "content": "What is 2 + 2?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = HttpCompletionProvider::with_base_url("sk-test", server.uri());
    provider.complete(&request()).await.unwrap();
}

#[tokio::test]
async fn maps_upstream_429_with_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&server)
        .await;

    let provider = HttpCompletionProvider::with_base_url("sk-test", server.uri());
    let err = provider.complete(&request()).await.unwrap_err();

    match err {
        GatewayError::UpstreamRateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(30)));
        }
        other => panic!("expected UpstreamRateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn maps_server_errors_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let provider = HttpCompletionProvider::with_base_url("sk-test", server.uri());
    let err = provider.complete(&request()).await.unwrap_err();

    match err {
        GatewayError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("internal error"));
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

#[tokio::test]
async fn rejects_malformed_response_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let provider = HttpCompletionProvider::with_base_url("sk-test", server.uri());
    let err = provider.complete(&request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::MalformedResponse(_)));
}

#[tokio::test]
async fn rejects_responses_without_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": []
        })))
        .mount(&server)
        .await;

    let provider = HttpCompletionProvider::with_base_url("sk-test", server.uri());
    let err = provider.complete(&request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::MalformedResponse(_)));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let provider = HttpCompletionProvider::with_base_url("sk-test", server.uri())
        .timeout(Duration::from_millis(50));
    let err = provider.complete(&request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Timeout(_)));
}
