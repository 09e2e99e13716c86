use thiserror::Error;

/// Custom error types for the dispatch layer.
///
/// The taxonomy mirrors how failures surface to a caller: configuration
/// problems fail fast at construction, credential problems carry a call to
/// action, and upstream HTTP failures are classified by status so the UI can
/// show remediation text instead of a raw status line.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
    #[error("Provider descriptor for '{provider}' is invalid: {reason}")]
    InvalidDescriptor { provider: String, reason: String },
    #[error("Server proxy is not configured")]
    ProxyNotConfigured,
    #[error("Unknown transport mode: {0} (expected 'server' or 'browser')")]
    UnknownTransportMode(String),
    #[error("No API key found for {provider}. Add your API key in settings to use this provider.")]
    MissingCredentials { provider: String },
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
    #[error("Network error calling {provider}: {detail}")]
    Network { provider: String, detail: String },
    #[error("Server proxy is unavailable: {0}")]
    ProxyUnavailable(String),
    #[error("Server proxy error: {0}")]
    ProxyRejected(String),
    #[error("Authentication failed for {provider}. Check that your API key is valid.")]
    AuthenticationFailed { provider: String },
    #[error("Permission denied by {provider}: {message}")]
    PermissionDenied { provider: String, message: String },
    #[error("Rate limited by {provider}. Wait a moment and try again.")]
    RateLimited { provider: String },
    #[error("{provider} server error (HTTP {status}). The provider is having trouble; try again later.")]
    UpstreamServer { provider: String, status: u16 },
    #[error("{provider} API error (HTTP {status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },
    #[error("Could not read a completion from the {provider} response: {reason}")]
    InvalidResponse { provider: String, reason: String },
    #[error("Header '{header}' contains characters that cannot be sent over HTTP: {detail}. Try typing the value by hand instead of pasting it.")]
    InvalidHeaderValue { header: String, detail: String },
    #[error("Prompt agent error: {0}")]
    Agent(String),
    #[error("Credential store error: {0}")]
    CredentialStore(String),
    #[error("Failed to deserialize: {0}")]
    Deserialization(#[from] serde_json::Error),
}
