use crate::errors::DispatchError;
use crate::registry::ProviderDescriptor;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The uniform request every transport understands.
///
/// Field names serialize in camelCase because this struct doubles as the
/// wire format of the server-proxy invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub provider_id: crate::registry::ProviderId,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub use_user_key: bool,
}

/// Per-call overrides a caller may attach when asking the factory for a
/// client.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub model: Option<String>,
    pub parameters: Option<Value>,
    pub agent_id: Option<String>,
    pub user_id: Option<String>,
    pub use_user_key: bool,
}

/// Latency/token/cost measurements attached to a completion.
///
/// In direct mode these are estimated locally; in proxy mode the server
/// reports them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionMetrics {
    /// Wall-clock latency in milliseconds.
    #[serde(rename = "latency")]
    pub latency_ms: u64,
    pub tokens: u32,
    pub cost: f64,
}

/// One completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<CompletionMetrics>,
}

/// Rough token estimate for pricing when the provider does not report usage.
/// Four characters per token is the conventional approximation.
pub fn estimate_tokens(text: &str) -> u32 {
    ((text.chars().count() + 3) / 4).max(1) as u32
}

/// An ephemeral client pairing one provider descriptor with one transport
/// and one set of per-call overrides.
///
/// Constructed by the [`ClientFactory`](crate::factory::ClientFactory) per
/// logical call site, used exactly once via [`generate`](Self::generate),
/// then discarded. It holds no cross-call state.
pub struct CompletionClient {
    pub(crate) descriptor: ProviderDescriptor,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) options: GenerateOptions,
}

impl CompletionClient {
    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    pub(crate) fn request_for(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            provider_id: self.descriptor.id,
            prompt: prompt.to_string(),
            model: self.options.model.clone(),
            parameters: self.options.parameters.clone(),
            agent_id: self.options.agent_id.clone(),
            user_id: self.options.user_id.clone(),
            use_user_key: self.options.use_user_key,
        }
    }

    /// Produces exactly one completed text response or a classified failure.
    ///
    /// No retries happen internally; a caller wanting retry re-invokes this.
    pub async fn generate(&self, prompt: &str) -> Result<Completion, DispatchError> {
        let request = self.request_for(prompt);
        self.transport.generate(&request).await
    }
}

impl fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.descriptor.id)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generate_request_serializes_in_camel_case() {
        let request = GenerateRequest {
            provider_id: crate::registry::ProviderId::Gemini,
            prompt: "hello".to_string(),
            model: Some("gemini-2.0-flash".to_string()),
            parameters: None,
            agent_id: None,
            user_id: Some("user-1".to_string()),
            use_user_key: true,
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(
            wire,
            json!({
                "providerId": "gemini",
                "prompt": "hello",
                "model": "gemini-2.0-flash",
                "userId": "user-1",
                "useUserKey": true
            })
        );
    }

    #[test]
    fn token_estimate_is_never_zero() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
