#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared helpers for the integration tests: a tracing bootstrap and
//! descriptor builders that point the dispatch templates at a local mock
//! server instead of the real provider endpoints.

use modelshift::registry::{
    ApiConfig, AuthScheme, Capabilities, CredentialField, InputKind, KeyRequirement,
    ProviderDescriptor, ProviderId,
};
use modelshift::types::GenerateRequest;
use reqwest::Method;
use serde_json::json;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber once for the test binary.
pub fn setup_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt::init();
    });
}

/// An OpenAI-shaped descriptor whose base URL points at a test server.
pub fn chat_descriptor(id: ProviderId, base_url: &str) -> ProviderDescriptor {
    ProviderDescriptor {
        id,
        display_name: "Test Provider",
        key_requirements: vec![KeyRequirement {
            field: CredentialField::ApiKey,
            label: "API Key",
            input_kind: InputKind::Password,
            required: true,
        }],
        capabilities: Capabilities {
            max_tokens: 1024,
            input_price_per_1k: 0.001,
            output_price_per_1k: 0.002,
        },
        api: ApiConfig {
            base_url: base_url.to_string(),
            endpoint_path: "/v1/chat/completions".to_string(),
            method: Method::POST,
            static_headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            auth: AuthScheme::Header {
                name: "Authorization",
                prefix: "Bearer ",
            },
            body_skeleton: json!({
                "model": "test-model",
                "messages": [{"role": "user", "content": ""}]
            }),
            prompt_path: "messages[0].content".to_string(),
            model_path: Some("model".to_string()),
            project_id_path: None,
            parameters_path: String::new(),
            response_path: "choices[0].message.content".to_string(),
            error_path: "error.message".to_string(),
            default_model: "test-model".to_string(),
            default_parameters: json!({"temperature": 0.0}),
        },
        is_available: true,
    }
}

/// A Gemini-shaped descriptor: query-parameter auth, model in the URL,
/// parameters nested under `generationConfig`.
pub fn query_auth_descriptor(id: ProviderId, base_url: &str) -> ProviderDescriptor {
    let mut descriptor = chat_descriptor(id, base_url);
    descriptor.api.endpoint_path = "/v1beta/models/{model}:generateContent".to_string();
    descriptor.api.auth = AuthScheme::QueryParam { name: "key" };
    descriptor.api.body_skeleton = json!({"contents": [{"parts": [{"text": ""}]}]});
    descriptor.api.prompt_path = "contents[0].parts[0].text".to_string();
    descriptor.api.model_path = None;
    descriptor.api.parameters_path = "generationConfig".to_string();
    descriptor.api.response_path = "candidates[0].content.parts[0].text".to_string();
    descriptor
}

/// A minimal uniform request for direct-transport tests.
pub fn request(provider: ProviderId, prompt: &str) -> GenerateRequest {
    GenerateRequest {
        provider_id: provider,
        prompt: prompt.to_string(),
        model: None,
        parameters: None,
        agent_id: None,
        user_id: None,
        use_user_key: false,
    }
}

/// The response body the OpenAI-shaped descriptor expects.
pub fn chat_completion_body(text: &str) -> serde_json::Value {
    json!({"choices": [{"message": {"role": "assistant", "content": text}}]})
}
