use std::sync::Arc;
use std::time::Duration;

use neuroforge::gateway::anthropic::AnthropicAdapter;
use neuroforge::gateway::openai::OpenAiAdapter;
use neuroforge::gateway::{
    ChatModel, CompletionGateway, CompletionRequest, NoopUsageSink, ProviderError, ProviderGateway,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_adapter(server: &MockServer) -> OpenAiAdapter {
    OpenAiAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5)).unwrap()
}

fn anthropic_adapter(server: &MockServer) -> AnthropicAdapter {
    AnthropicAdapter::with_config("sk-ant-test", server.uri(), Duration::from_secs(5)).unwrap()
}

fn openai_ok_body(content: &str) -> Value {
    json!({
        "choices": [{ "message": { "content": content } }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 34 }
    })
}

#[tokio::test]
async fn openai_sends_system_and_user_without_token_cap() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_ok_body("  hello  \n")))
        .mount(&server)
        .await;

    let adapter = openai_adapter(&server);
    let req = CompletionRequest::new(
        ChatModel::openai("gpt-4o"),
        "You restructure requests.",
        "Task: pong",
        "test",
    );

    let resp = adapter.complete(&req).await.unwrap();
    assert_eq!(resp.text, "hello");
    assert_eq!(resp.input_tokens, 12);
    assert_eq!(resp.output_tokens, 34);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "You restructure requests.");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "Task: pong");
    // No explicit output cap on this path.
    assert!(body.get("max_tokens").is_none());
}

#[tokio::test]
async fn openai_surfaces_api_error_with_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("x-request-id", "req-42")
                .set_body_json(json!({
                    "error": { "message": "overloaded", "code": "server_overloaded" }
                })),
        )
        .mount(&server)
        .await;

    let adapter = openai_adapter(&server);
    let req = CompletionRequest::new(ChatModel::openai("gpt-4o"), "role", "prompt", "test");

    let err = adapter.complete(&req).await.unwrap_err();
    match err {
        ProviderError::Provider {
            provider,
            message,
            context,
        } => {
            assert_eq!(provider, "openai");
            assert_eq!(message, "overloaded");
            let ctx = context.expect("expected error context");
            assert_eq!(ctx.http_status, Some(503));
            assert_eq!(ctx.provider_code.as_deref(), Some("server_overloaded"));
            assert_eq!(ctx.request_id.as_deref(), Some("req-42"));
        }
        other => panic!("expected Provider error, got {other:?}"),
    }

    // Exactly one outbound call, no retry.
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn openai_missing_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let adapter = openai_adapter(&server);
    let req = CompletionRequest::new(ChatModel::openai("gpt-4o"), "role", "prompt", "test");

    let err = adapter.complete(&req).await.unwrap_err();
    assert!(matches!(err, ProviderError::Provider { .. }), "{err:?}");
}

#[tokio::test]
async fn anthropic_concatenates_text_blocks_and_trims() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                { "type": "text", "text": "  A" },
                { "type": "image", "source": { "type": "base64" } },
                { "type": "text", "text": "B  " }
            ],
            "usage": { "input_tokens": 5, "output_tokens": 7 }
        })))
        .mount(&server)
        .await;

    let adapter = anthropic_adapter(&server);
    let req = CompletionRequest::new(
        ChatModel::anthropic("claude-3-7-sonnet-20250219"),
        "role",
        "prompt",
        "test",
    )
    .max_tokens(16_384);

    let resp = adapter.complete(&req).await.unwrap();
    // Text blocks in sequence order, non-text blocks dropped, then trimmed.
    assert_eq!(resp.text, "AB");
    assert_eq!(resp.input_tokens, 5);
    assert_eq!(resp.output_tokens, 7);
}

#[tokio::test]
async fn anthropic_sends_auxiliary_assistant_turn_and_max_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "<!DOCTYPE html></html>" }],
            "usage": { "input_tokens": 1, "output_tokens": 1 }
        })))
        .mount(&server)
        .await;

    let adapter = anthropic_adapter(&server);
    let req = CompletionRequest::new(
        ChatModel::anthropic("claude-3-7-sonnet-20250219"),
        "You emit the final document.",
        "Task: pong\nDecision: plan A",
        "test",
    )
    .max_tokens(16_384);

    adapter.complete(&req).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0].headers.get("x-api-key").unwrap(),
        "sk-ant-test"
    );
    assert_eq!(
        received[0].headers.get("anthropic-version").unwrap(),
        "2023-06-01"
    );

    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["model"], "claude-3-7-sonnet-20250219");
    assert_eq!(body["max_tokens"], 16_384);
    // The role rides in an auxiliary assistant turn, not a system channel.
    assert_eq!(body["messages"][0]["role"], "assistant");
    assert_eq!(body["messages"][0]["content"], "You emit the final document.");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "Task: pong\nDecision: plan A");
}

#[tokio::test]
async fn anthropic_defaults_max_tokens_when_caller_sets_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "ok" }]
        })))
        .mount(&server)
        .await;

    let adapter = anthropic_adapter(&server);
    let req = CompletionRequest::new(
        ChatModel::anthropic("claude-3-7-sonnet-20250219"),
        "role",
        "prompt",
        "test",
    );

    adapter.complete(&req).await.unwrap();

    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(
        body["max_tokens"],
        neuroforge::gateway::anthropic::DEFAULT_MAX_TOKENS
    );
}

#[tokio::test]
async fn anthropic_surfaces_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "type": "error",
            "error": { "type": "invalid_request_error", "message": "max_tokens required" }
        })))
        .mount(&server)
        .await;

    let adapter = anthropic_adapter(&server);
    let req = CompletionRequest::new(
        ChatModel::anthropic("claude-3-7-sonnet-20250219"),
        "role",
        "prompt",
        "test",
    );

    let err = adapter.complete(&req).await.unwrap_err();
    match err {
        ProviderError::Provider {
            provider,
            message,
            context,
        } => {
            assert_eq!(provider, "anthropic");
            assert_eq!(message, "max_tokens required");
            let ctx = context.expect("expected error context");
            assert_eq!(ctx.http_status, Some(400));
            assert_eq!(ctx.provider_code.as_deref(), Some("invalid_request_error"));
        }
        other => panic!("expected Provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn gateway_routes_models_to_their_provider() {
    let openai_server = MockServer::start().await;
    let anthropic_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_ok_body("from openai")))
        .mount(&openai_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "from anthropic" }]
        })))
        .mount(&anthropic_server)
        .await;

    let gateway = ProviderGateway::with_adapters(
        openai_adapter(&openai_server),
        anthropic_adapter(&anthropic_server),
        Arc::new(NoopUsageSink),
    );

    let resp = gateway
        .complete(CompletionRequest::new(
            ChatModel::openai("gpt-4o"),
            "role",
            "prompt",
            "test",
        ))
        .await
        .unwrap();
    assert_eq!(resp.text, "from openai");

    let resp = gateway
        .complete(CompletionRequest::new(
            ChatModel::anthropic("claude-3-7-sonnet-20250219"),
            "role",
            "prompt",
            "test",
        ))
        .await
        .unwrap();
    assert_eq!(resp.text, "from anthropic");

    assert_eq!(openai_server.received_requests().await.unwrap().len(), 1);
    assert_eq!(anthropic_server.received_requests().await.unwrap().len(), 1);
}
