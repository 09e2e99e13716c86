//! # Direct Transport
//!
//! Builds the full provider HTTP request locally from the descriptor's
//! declarative template: endpoint resolution (including query-parameter
//! credentials), header assembly and sanitization, JSON-path-driven body
//! construction, and status-code error classification on the way back.

use crate::credentials::{validate_for, ProviderCredentials};
use crate::errors::DispatchError;
use crate::headers::sanitize_headers;
use crate::json_path::{get_value_at_path, merge_at_path, set_value_at_path};
use crate::registry::{AuthScheme, ProviderDescriptor};
use crate::transport::Transport;
use crate::types::{estimate_tokens, Completion, CompletionMetrics, GenerateRequest};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client as ReqwestClient;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// A client that talks to the provider's REST endpoint itself, using a
/// locally held credential set. One instance serves one descriptor and one
/// credential set; it holds no per-call state.
#[derive(Debug, Clone)]
pub struct DirectTransport {
    descriptor: ProviderDescriptor,
    credentials: ProviderCredentials,
    http: ReqwestClient,
}

impl DirectTransport {
    pub fn new(
        descriptor: ProviderDescriptor,
        credentials: ProviderCredentials,
    ) -> Result<Self, DispatchError> {
        descriptor.validate()?;
        validate_for(&descriptor, &credentials)?;
        let http = ReqwestClient::builder()
            .build()
            .map_err(DispatchError::ClientBuild)?;
        Ok(Self {
            descriptor,
            credentials,
            http,
        })
    }

    /// Resolves the endpoint URL, substituting the model into the path and
    /// appending the credential for query-parameter-authenticated providers.
    fn endpoint(&self, model: &str) -> String {
        let api = &self.descriptor.api;
        let path = api.endpoint_path.replace("{model}", model);
        let mut url = format!("{}{path}", api.base_url);
        if let AuthScheme::QueryParam { name } = &api.auth {
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push(separator);
            url.push_str(name);
            url.push('=');
            url.push_str(&self.credentials.api_key);
        }
        url
    }

    /// Merges static headers with the auth header, sanitizes the set, and
    /// converts it into typed header values.
    fn headers(&self) -> Result<HeaderMap, DispatchError> {
        let api = &self.descriptor.api;
        let mut pairs = api.static_headers.clone();
        if let AuthScheme::Header { name, prefix } = &api.auth {
            pairs.push((
                name.to_string(),
                format!("{prefix}{}", self.credentials.api_key),
            ));
        }

        let mut map = HeaderMap::new();
        for (name, value) in sanitize_headers(pairs) {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                DispatchError::InvalidHeaderValue {
                    header: name.clone(),
                    detail: e.to_string(),
                }
            })?;
            let header_value =
                HeaderValue::from_str(&value).map_err(|e| DispatchError::InvalidHeaderValue {
                    header: name.clone(),
                    detail: e.to_string(),
                })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    /// Deep-clones the body skeleton and injects prompt, model, project id,
    /// and parameters at their declared paths.
    fn body(&self, request: &GenerateRequest, model: &str) -> Value {
        let api = &self.descriptor.api;
        let mut body = api.body_skeleton.clone();

        set_value_at_path(&mut body, &api.prompt_path, Value::String(request.prompt.clone()));
        if let Some(model_path) = &api.model_path {
            set_value_at_path(&mut body, model_path, Value::String(model.to_string()));
        }
        if let (Some(project_path), Some(project_id)) =
            (&api.project_id_path, &self.credentials.project_id)
        {
            set_value_at_path(&mut body, project_path, Value::String(project_id.clone()));
        }

        merge_at_path(&mut body, &api.parameters_path, &api.default_parameters);
        if let Some(parameters) = &request.parameters {
            merge_at_path(&mut body, &api.parameters_path, parameters);
        }
        body
    }

    /// Maps a non-2xx response to the error taxonomy, surfacing the
    /// provider's own message when the body parses and the descriptor's
    /// error path resolves.
    fn classify_failure(&self, status: u16, body_text: &str) -> DispatchError {
        let provider = self.descriptor.id.to_string();
        let message = serde_json::from_str::<Value>(body_text)
            .ok()
            .as_ref()
            .and_then(|body| get_value_at_path(body, &self.descriptor.api.error_path))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                let trimmed = body_text.trim();
                if trimmed.is_empty() {
                    format!("HTTP {status}")
                } else {
                    trimmed.chars().take(300).collect()
                }
            });

        match status {
            401 => DispatchError::AuthenticationFailed { provider },
            403 => DispatchError::PermissionDenied { provider, message },
            429 => DispatchError::RateLimited { provider },
            s if s >= 500 => DispatchError::UpstreamServer {
                provider,
                status: s,
            },
            s => DispatchError::Api {
                provider,
                status: s,
                message,
            },
        }
    }

    /// Classifies a `reqwest` failure before any response arrived.
    fn classify_network(&self, error: reqwest::Error) -> DispatchError {
        let provider = self.descriptor.id.to_string();
        if error.is_builder() || error.to_string().contains("header") {
            // A request that could not even be constructed almost always
            // means an invalid character slipped into a credential.
            return DispatchError::InvalidHeaderValue {
                header: "request".to_string(),
                detail: error.to_string(),
            };
        }
        let detail = if error.is_connect() {
            format!(
                "could not reach {}. Check your network connection, or switch to server mode if this endpoint blocks direct requests",
                self.descriptor.api.base_url
            )
        } else if error.is_timeout() {
            "the request timed out".to_string()
        } else {
            error.to_string()
        };
        DispatchError::Network { provider, detail }
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn generate(&self, request: &GenerateRequest) -> Result<Completion, DispatchError> {
        let api = &self.descriptor.api;
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| api.default_model.clone());
        let url = self.endpoint(&model);
        let headers = self.headers()?;
        let body = self.body(request, &model);

        // Log the path, not the URL: query-param providers embed the key.
        debug!(
            provider = %self.descriptor.id,
            path = %api.endpoint_path,
            %model,
            "--> dispatching direct request"
        );

        let started = Instant::now();
        let response = self
            .http
            .request(api.method.clone(), &url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_network(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let classified = self.classify_failure(status.as_u16(), &body_text);
            warn!(provider = %self.descriptor.id, %status, "<-- provider call failed: {classified}");
            return Err(classified);
        }

        let parsed: Value =
            response
                .json()
                .await
                .map_err(|e| DispatchError::InvalidResponse {
                    provider: self.descriptor.id.to_string(),
                    reason: format!("body is not valid JSON: {e}"),
                })?;

        let text = get_value_at_path(&parsed, &api.response_path)
            .and_then(Value::as_str)
            .ok_or_else(|| DispatchError::InvalidResponse {
                provider: self.descriptor.id.to_string(),
                reason: format!("no text found at '{}'", api.response_path),
            })?
            .to_string();

        let input_tokens = estimate_tokens(&request.prompt);
        let output_tokens = estimate_tokens(&text);
        let metrics = CompletionMetrics {
            latency_ms: started.elapsed().as_millis() as u64,
            tokens: input_tokens + output_tokens,
            cost: self
                .descriptor
                .capabilities
                .estimate_cost(input_tokens, output_tokens),
        };

        debug!(
            provider = %self.descriptor.id,
            latency_ms = metrics.latency_ms,
            "<-- completion received"
        );
        Ok(Completion {
            text,
            metrics: Some(metrics),
        })
    }
}
