//! # Server-Proxy Transport
//!
//! Delegates generation to a server-side dispatch function that holds
//! provider credentials centrally, so keys never reach this process. The
//! proxy also exposes a health check the factory probes before committing to
//! this mode.

use crate::errors::DispatchError;
use crate::transport::Transport;
use crate::types::{Completion, CompletionMetrics, GenerateRequest};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tracing::debug;

/// Where the server proxy lives and how to authenticate to it.
#[derive(Clone)]
pub struct ProxyConfig {
    /// Base URL of the dispatch function, e.g. `https://api.example.com/functions`.
    pub base_url: String,
    /// Optional bearer token for the proxy itself (not a provider key).
    pub shared_secret: Option<String>,
}

// The shared secret stays out of debug output.
impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("base_url", &self.base_url)
            .field("shared_secret", &self.shared_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ProxyConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            shared_secret: None,
        }
    }

    pub fn with_shared_secret(mut self, secret: impl Into<String>) -> Self {
        self.shared_secret = Some(secret.into());
        self
    }

    /// Distinguishes a real deployment from placeholder/demo values left in
    /// an environment file.
    pub fn is_configured(&self) -> bool {
        let url = self.base_url.trim();
        !url.is_empty()
            && url.starts_with("http")
            && !url.contains("your-project")
            && !url.contains("example.com")
    }
}

/// What the proxy's `health-check` endpoint reports.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub available: bool,
    pub authenticated: bool,
    #[serde(default)]
    pub configured_providers: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl HealthReport {
    /// Both conditions must hold before the factory will commit to proxy
    /// mode.
    pub fn healthy(&self) -> bool {
        self.available && self.authenticated
    }

    fn unavailable(reason: String) -> Self {
        Self {
            available: false,
            authenticated: false,
            configured_providers: Vec::new(),
            errors: vec![reason],
        }
    }
}

/// The wire shape the dispatch function answers with.
#[derive(Debug, Deserialize)]
struct ProxyResponse {
    success: bool,
    response: Option<String>,
    error: Option<String>,
    metrics: Option<CompletionMetrics>,
}

/// A client that forwards the uniform request to the server-side dispatch
/// function and maps its envelope back.
#[derive(Debug, Clone)]
pub struct ProxyTransport {
    config: ProxyConfig,
    http: ReqwestClient,
}

impl ProxyTransport {
    pub fn new(config: ProxyConfig) -> Result<Self, DispatchError> {
        if !config.is_configured() {
            return Err(DispatchError::ProxyNotConfigured);
        }
        let http = ReqwestClient::builder()
            .build()
            .map_err(DispatchError::ClientBuild)?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.shared_secret {
            Some(secret) => builder.bearer_auth(secret),
            None => builder,
        }
    }

    /// Probes the proxy. Probe failures yield an unavailable report rather
    /// than an error: the caller's next move (fall back to direct mode) is
    /// the same either way.
    pub async fn health(&self) -> HealthReport {
        let request = self.with_auth(self.http.get(self.url("health-check")));
        match request.send().await {
            Ok(response) if response.status().is_success() => response
                .json::<HealthReport>()
                .await
                .unwrap_or_else(|e| {
                    HealthReport::unavailable(format!("health report was malformed: {e}"))
                }),
            Ok(response) => {
                HealthReport::unavailable(format!("health check returned HTTP {}", response.status()))
            }
            Err(e) => HealthReport::unavailable(e.to_string()),
        }
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    async fn generate(&self, request: &GenerateRequest) -> Result<Completion, DispatchError> {
        debug!(provider = %request.provider_id, "--> dispatching via server proxy");

        let response = self
            .with_auth(self.http.post(self.url("ai-proxy")))
            .json(request)
            .send()
            .await
            .map_err(|e| DispatchError::ProxyUnavailable(e.to_string()))?;

        let status = response.status();
        let envelope: ProxyResponse = if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| DispatchError::InvalidResponse {
                    provider: request.provider_id.to_string(),
                    reason: format!("proxy envelope was malformed: {e}"),
                })?
        } else {
            // Dispatch errors usually still arrive as a ProxyResponse body.
            let body_text = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ProxyResponse>(&body_text) {
                Ok(envelope) => envelope,
                Err(_) => {
                    return Err(DispatchError::ProxyRejected(format!(
                        "HTTP {status}: {}",
                        body_text.trim()
                    )))
                }
            }
        };

        if !envelope.success {
            return Err(DispatchError::ProxyRejected(
                envelope
                    .error
                    .unwrap_or_else(|| "dispatch failed with no error message".to_string()),
            ));
        }

        let text = envelope
            .response
            .ok_or_else(|| DispatchError::InvalidResponse {
                provider: request.provider_id.to_string(),
                reason: "proxy reported success but carried no response text".to_string(),
            })?;

        Ok(Completion {
            text,
            metrics: envelope.metrics,
        })
    }
}
