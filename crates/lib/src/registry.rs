//! # Provider Registry
//!
//! The static catalog of supported LLM providers. Each entry is a declarative
//! descriptor: where the API lives, how the credential is attached, what the
//! request body skeleton looks like, and which JSON paths locate the prompt,
//! the model, the parameters, and the generated text. The transports never
//! hard-code a provider shape; everything they need is read from here.
//!
//! Descriptors are immutable for the lifetime of a session. A missing
//! `prompt_path` or `response_path` is a configuration bug caught by
//! [`ProviderRegistry::new`], not a runtime condition to recover from.

use crate::errors::DispatchError;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Identity of a supported provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Gemini,
    #[serde(alias = "claude")]
    Anthropic,
    #[serde(alias = "ibm")]
    WatsonX,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Gemini => "gemini",
            ProviderId::Anthropic => "anthropic",
            ProviderId::WatsonX => "watsonx",
        }
    }

    /// All known provider ids, in display order.
    pub fn all() -> [ProviderId; 4] {
        [
            ProviderId::OpenAi,
            ProviderId::Gemini,
            ProviderId::Anthropic,
            ProviderId::WatsonX,
        ]
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAi),
            "gemini" | "google" => Ok(ProviderId::Gemini),
            "anthropic" | "claude" => Ok(ProviderId::Anthropic),
            "watsonx" | "ibm" => Ok(ProviderId::WatsonX),
            other => Err(DispatchError::UnknownProvider(other.to_string())),
        }
    }
}

/// The named credential fields a provider can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    ApiKey,
    ProjectId,
}

/// How a credential field should be collected from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Masked input; never echoed back.
    Password,
    Text,
}

/// One credential field a provider needs before it can be called.
#[derive(Debug, Clone)]
pub struct KeyRequirement {
    pub field: CredentialField,
    pub label: &'static str,
    pub input_kind: InputKind,
    pub required: bool,
}

/// Declared provider limits and per-1000-token pricing.
///
/// Used only for cost estimation in the comparison view, never for
/// enforcement.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub max_tokens: u32,
    pub input_price_per_1k: f64,
    pub output_price_per_1k: f64,
}

impl Capabilities {
    /// Estimated cost in USD for a call with the given token counts.
    pub fn estimate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        f64::from(input_tokens) / 1000.0 * self.input_price_per_1k
            + f64::from(output_tokens) / 1000.0 * self.output_price_per_1k
    }
}

/// How the API key is attached to a request.
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// The key is appended to the URL as a query parameter (e.g. Gemini).
    QueryParam { name: &'static str },
    /// The key is sent in a header, optionally with a prefix such as
    /// `"Bearer "`.
    Header {
        name: &'static str,
        prefix: &'static str,
    },
}

/// The declarative request/response template for one provider.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Endpoint path. May contain a `{model}` placeholder for providers that
    /// address the model in the URL rather than the body.
    pub endpoint_path: String,
    pub method: Method,
    pub static_headers: Vec<(String, String)>,
    pub auth: AuthScheme,
    /// The JSON skeleton each request body starts from.
    pub body_skeleton: Value,
    /// Where inside the skeleton the prompt text goes. Never empty.
    pub prompt_path: String,
    /// Where the model name goes, for providers that carry it in the body.
    pub model_path: Option<String>,
    /// Where the project id goes, for the one provider that needs it.
    pub project_id_path: Option<String>,
    /// Where the free-form parameters object is merged. Empty string means
    /// the request body root.
    pub parameters_path: String,
    /// Where the generated text is read from the response. Never empty.
    pub response_path: String,
    /// Where an error message is read from a failure response body.
    pub error_path: String,
    pub default_model: String,
    pub default_parameters: Value,
}

/// A complete provider descriptor: identity, credential requirements,
/// declared capabilities, and the API template.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub display_name: &'static str,
    pub key_requirements: Vec<KeyRequirement>,
    pub capabilities: Capabilities,
    pub api: ApiConfig,
    pub is_available: bool,
}

impl ProviderDescriptor {
    /// Checks the invariants the transports rely on.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.api.prompt_path.is_empty() {
            return Err(DispatchError::InvalidDescriptor {
                provider: self.id.to_string(),
                reason: "prompt_path must not be empty".to_string(),
            });
        }
        if self.api.response_path.is_empty() {
            return Err(DispatchError::InvalidDescriptor {
                provider: self.id.to_string(),
                reason: "response_path must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Whether this provider requires the given credential field.
    pub fn requires(&self, field: CredentialField) -> bool {
        self.key_requirements
            .iter()
            .any(|req| req.field == field && req.required)
    }
}

/// The read-only collection of provider descriptors for a session.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Builds a registry from explicit descriptors, validating each one.
    pub fn new(providers: Vec<ProviderDescriptor>) -> Result<Self, DispatchError> {
        for descriptor in &providers {
            descriptor.validate()?;
        }
        Ok(Self { providers })
    }

    /// The built-in registry with the four supported providers.
    pub fn builtin() -> Self {
        let registry = Self {
            providers: builtin_providers(),
        };
        debug_assert!(registry
            .providers
            .iter()
            .all(|descriptor| descriptor.validate().is_ok()));
        registry
    }

    pub fn get_provider(&self, id: ProviderId) -> Option<&ProviderDescriptor> {
        self.providers
            .iter()
            .find(|descriptor| descriptor.id == id)
    }

    /// Descriptors currently offered to the user.
    pub fn get_available_providers(&self) -> Vec<&ProviderDescriptor> {
        self.providers
            .iter()
            .filter(|descriptor| descriptor.is_available)
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn api_key_requirement() -> KeyRequirement {
    KeyRequirement {
        field: CredentialField::ApiKey,
        label: "API Key",
        input_kind: InputKind::Password,
        required: true,
    }
}

fn builtin_providers() -> Vec<ProviderDescriptor> {
    vec![
        ProviderDescriptor {
            id: ProviderId::OpenAi,
            display_name: "OpenAI",
            key_requirements: vec![api_key_requirement()],
            capabilities: Capabilities {
                max_tokens: 4096,
                input_price_per_1k: 0.03,
                output_price_per_1k: 0.06,
            },
            api: ApiConfig {
                base_url: "https://api.openai.com".to_string(),
                endpoint_path: "/v1/chat/completions".to_string(),
                method: Method::POST,
                static_headers: vec![(
                    "Content-Type".to_string(),
                    "application/json".to_string(),
                )],
                auth: AuthScheme::Header {
                    name: "Authorization",
                    prefix: "Bearer ",
                },
                body_skeleton: json!({
                    "model": "gpt-4",
                    "messages": [{"role": "user", "content": ""}]
                }),
                prompt_path: "messages[0].content".to_string(),
                model_path: Some("model".to_string()),
                project_id_path: None,
                parameters_path: String::new(),
                response_path: "choices[0].message.content".to_string(),
                error_path: "error.message".to_string(),
                default_model: "gpt-4".to_string(),
                default_parameters: json!({"temperature": 0.7, "max_tokens": 1000}),
            },
            is_available: true,
        },
        ProviderDescriptor {
            id: ProviderId::Gemini,
            display_name: "Google Gemini",
            key_requirements: vec![api_key_requirement()],
            capabilities: Capabilities {
                max_tokens: 8192,
                input_price_per_1k: 0.000125,
                output_price_per_1k: 0.000375,
            },
            api: ApiConfig {
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                endpoint_path: "/v1beta/models/{model}:generateContent".to_string(),
                method: Method::POST,
                static_headers: vec![(
                    "Content-Type".to_string(),
                    "application/json".to_string(),
                )],
                auth: AuthScheme::QueryParam { name: "key" },
                body_skeleton: json!({
                    "contents": [{"parts": [{"text": ""}]}]
                }),
                prompt_path: "contents[0].parts[0].text".to_string(),
                model_path: None,
                project_id_path: None,
                parameters_path: "generationConfig".to_string(),
                response_path: "candidates[0].content.parts[0].text".to_string(),
                error_path: "error.message".to_string(),
                default_model: "gemini-2.0-flash".to_string(),
                default_parameters: json!({"temperature": 0.7, "maxOutputTokens": 1000}),
            },
            is_available: true,
        },
        ProviderDescriptor {
            id: ProviderId::Anthropic,
            display_name: "Anthropic Claude",
            key_requirements: vec![api_key_requirement()],
            capabilities: Capabilities {
                max_tokens: 4096,
                input_price_per_1k: 0.003,
                output_price_per_1k: 0.015,
            },
            api: ApiConfig {
                base_url: "https://api.anthropic.com".to_string(),
                endpoint_path: "/v1/messages".to_string(),
                method: Method::POST,
                static_headers: vec![
                    ("Content-Type".to_string(), "application/json".to_string()),
                    ("anthropic-version".to_string(), "2023-06-01".to_string()),
                ],
                auth: AuthScheme::Header {
                    name: "x-api-key",
                    prefix: "",
                },
                body_skeleton: json!({
                    "model": "claude-3-5-sonnet-20241022",
                    "max_tokens": 1000,
                    "messages": [{"role": "user", "content": ""}]
                }),
                prompt_path: "messages[0].content".to_string(),
                model_path: Some("model".to_string()),
                project_id_path: None,
                parameters_path: String::new(),
                response_path: "content[0].text".to_string(),
                error_path: "error.message".to_string(),
                default_model: "claude-3-5-sonnet-20241022".to_string(),
                default_parameters: json!({"temperature": 0.7}),
            },
            is_available: true,
        },
        ProviderDescriptor {
            id: ProviderId::WatsonX,
            display_name: "IBM WatsonX",
            key_requirements: vec![
                api_key_requirement(),
                KeyRequirement {
                    field: CredentialField::ProjectId,
                    label: "Project ID",
                    input_kind: InputKind::Text,
                    required: true,
                },
            ],
            capabilities: Capabilities {
                max_tokens: 4096,
                input_price_per_1k: 0.0006,
                output_price_per_1k: 0.0006,
            },
            api: ApiConfig {
                base_url: "https://us-south.ml.cloud.ibm.com".to_string(),
                endpoint_path: "/ml/v1/text/generation?version=2023-05-29".to_string(),
                method: Method::POST,
                static_headers: vec![(
                    "Content-Type".to_string(),
                    "application/json".to_string(),
                )],
                auth: AuthScheme::Header {
                    name: "Authorization",
                    prefix: "Bearer ",
                },
                body_skeleton: json!({
                    "input": "",
                    "model_id": "ibm/granite-3-8b-instruct",
                    "project_id": ""
                }),
                prompt_path: "input".to_string(),
                model_path: Some("model_id".to_string()),
                project_id_path: Some("project_id".to_string()),
                parameters_path: "parameters".to_string(),
                response_path: "results[0].generated_text".to_string(),
                error_path: "errors[0].message".to_string(),
                default_model: "ibm/granite-3-8b-instruct".to_string(),
                default_parameters: json!({"max_new_tokens": 1000, "temperature": 0.7}),
            },
            is_available: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_path::{get_value_at_path, set_value_at_path};
    use serde_json::json;

    #[test]
    fn builtin_registry_exposes_all_four_providers() {
        let registry = ProviderRegistry::builtin();
        for id in ProviderId::all() {
            assert!(registry.get_provider(id).is_some(), "missing {id}");
        }
        assert_eq!(registry.get_available_providers().len(), 4);
    }

    #[test]
    fn every_descriptor_round_trips_the_prompt_through_its_skeleton() {
        let registry = ProviderRegistry::builtin();
        for descriptor in registry.get_available_providers() {
            let mut body = descriptor.api.body_skeleton.clone();
            set_value_at_path(&mut body, &descriptor.api.prompt_path, json!("round trip"));
            assert_eq!(
                get_value_at_path(&body, &descriptor.api.prompt_path),
                Some(&json!("round trip")),
                "prompt path does not round-trip for {}",
                descriptor.id
            );
        }
    }

    #[test]
    fn provider_id_parses_aliases() {
        assert_eq!("claude".parse::<ProviderId>().unwrap(), ProviderId::Anthropic);
        assert_eq!("ibm".parse::<ProviderId>().unwrap(), ProviderId::WatsonX);
        assert_eq!("OpenAI".parse::<ProviderId>().unwrap(), ProviderId::OpenAi);
        assert!("mistral".parse::<ProviderId>().is_err());
    }

    #[test]
    fn watsonx_requires_a_project_id() {
        let registry = ProviderRegistry::builtin();
        let watsonx = registry.get_provider(ProviderId::WatsonX).unwrap();
        assert!(watsonx.requires(CredentialField::ProjectId));
        let openai = registry.get_provider(ProviderId::OpenAi).unwrap();
        assert!(!openai.requires(CredentialField::ProjectId));
    }

    #[test]
    fn empty_paths_fail_validation() {
        let mut providers = builtin_providers();
        providers[0].api.response_path = String::new();
        let err = ProviderRegistry::new(providers).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidDescriptor { .. }));
    }
}
