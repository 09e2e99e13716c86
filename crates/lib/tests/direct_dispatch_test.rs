//! # Direct Dispatch Tests
//!
//! Exercises the descriptor-driven direct transport against a mock server:
//! request construction (auth placement, body templating) and response
//! handling (text extraction, status classification).

mod common;

use common::{chat_completion_body, chat_descriptor, query_auth_descriptor, request, setup_tracing};
use modelshift::credentials::ProviderCredentials;
use modelshift::errors::DispatchError;
use modelshift::registry::ProviderId;
use modelshift::transport::{DirectTransport, Transport};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn extracts_the_completion_at_the_declared_response_path() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "messages": [{"role": "user", "content": "say hi"}],
            "temperature": 0.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body("hi there")))
        .mount(&server)
        .await;

    let transport = DirectTransport::new(
        chat_descriptor(ProviderId::OpenAi, &server.uri()),
        ProviderCredentials::new("sk-test"),
    )
    .unwrap();

    let completion = transport
        .generate(&request(ProviderId::OpenAi, "say hi"))
        .await
        .unwrap();

    assert_eq!(completion.text, "hi there");
    let metrics = completion.metrics.unwrap();
    assert!(metrics.tokens > 0);
    assert!(metrics.cost > 0.0);
}

#[tokio::test]
async fn query_param_auth_goes_in_the_url_with_the_model_substituted() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:generateContent"))
        .and(query_param("key", "g-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "bonjour"}]}}]
        })))
        .mount(&server)
        .await;

    let transport = DirectTransport::new(
        query_auth_descriptor(ProviderId::Gemini, &server.uri()),
        ProviderCredentials::new("g-key"),
    )
    .unwrap();

    let completion = transport
        .generate(&request(ProviderId::Gemini, "say hi in French"))
        .await
        .unwrap();
    assert_eq!(completion.text, "bonjour");
}

#[tokio::test]
async fn caller_parameters_land_at_the_declared_parameters_path() {
    setup_tracing();
    let server = MockServer::start().await;

    // The Gemini-shaped descriptor nests parameters under generationConfig.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "generationConfig": {"temperature": 0.9}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}]}}]
        })))
        .mount(&server)
        .await;

    let transport = DirectTransport::new(
        query_auth_descriptor(ProviderId::Gemini, &server.uri()),
        ProviderCredentials::new("g-key"),
    )
    .unwrap();

    let mut req = request(ProviderId::Gemini, "anything");
    req.parameters = Some(json!({"temperature": 0.9}));
    transport.generate(&req).await.unwrap();
}

#[tokio::test]
async fn a_401_classifies_as_authentication_failure() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided"}
        })))
        .mount(&server)
        .await;

    let transport = DirectTransport::new(
        chat_descriptor(ProviderId::OpenAi, &server.uri()),
        ProviderCredentials::new("sk-bad"),
    )
    .unwrap();

    let err = transport
        .generate(&request(ProviderId::OpenAi, "say hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::AuthenticationFailed { .. }));
    assert!(err.to_string().contains("Authentication failed"));
}

#[tokio::test]
async fn a_429_classifies_as_rate_limited_and_a_500_as_upstream() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let transport = DirectTransport::new(
        chat_descriptor(ProviderId::OpenAi, &server.uri()),
        ProviderCredentials::new("sk-test"),
    )
    .unwrap();
    let err = transport
        .generate(&request(ProviderId::OpenAi, "hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::RateLimited { .. }));

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let transport = DirectTransport::new(
        chat_descriptor(ProviderId::OpenAi, &server.uri()),
        ProviderCredentials::new("sk-test"),
    )
    .unwrap();
    let err = transport
        .generate(&request(ProviderId::OpenAi, "hi"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::UpstreamServer { status: 503, .. }
    ));
}

#[tokio::test]
async fn other_failures_surface_the_provider_message_from_the_error_path() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "max_tokens is too large"}
        })))
        .mount(&server)
        .await;

    let transport = DirectTransport::new(
        chat_descriptor(ProviderId::OpenAi, &server.uri()),
        ProviderCredentials::new("sk-test"),
    )
    .unwrap();

    let err = transport
        .generate(&request(ProviderId::OpenAi, "hi"))
        .await
        .unwrap_err();
    match err {
        DispatchError::Api {
            status, message, ..
        } => {
            assert_eq!(status, 400);
            assert_eq!(message, "max_tokens is too large");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn a_success_body_without_the_response_path_is_an_invalid_response() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let transport = DirectTransport::new(
        chat_descriptor(ProviderId::OpenAi, &server.uri()),
        ProviderCredentials::new("sk-test"),
    )
    .unwrap();

    let err = transport
        .generate(&request(ProviderId::OpenAi, "hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidResponse { .. }));
}

#[tokio::test]
async fn an_unreachable_endpoint_classifies_as_a_network_failure() {
    setup_tracing();
    // Nothing listens on port 1.
    let transport = DirectTransport::new(
        chat_descriptor(ProviderId::OpenAi, "http://127.0.0.1:1"),
        ProviderCredentials::new("sk-test"),
    )
    .unwrap();

    let err = transport
        .generate(&request(ProviderId::OpenAi, "hi"))
        .await
        .unwrap_err();
    match err {
        DispatchError::Network { detail, .. } => {
            assert!(detail.contains("could not reach"), "got: {detail}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
