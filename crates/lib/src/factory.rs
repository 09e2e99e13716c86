//! # Client Factory
//!
//! The single entry point that decides, per call, which transport backs a
//! client: the server proxy when the user prefers it *and* it is configured
//! *and* a health probe says it is available and authenticated; otherwise
//! direct dispatch with a locally stored credential. The transport-mode
//! preference is threaded in explicitly — persistence of that flag belongs
//! to the caller.

use crate::credentials::{CredentialStore, ProviderCredentials};
use crate::errors::DispatchError;
use crate::registry::{ProviderDescriptor, ProviderId, ProviderRegistry};
use crate::transport::{DirectTransport, ProxyConfig, ProxyTransport, TransportMode};
use crate::types::{CompletionClient, GenerateOptions};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds ephemeral [`CompletionClient`]s. One factory per session; one
/// client per call.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    registry: Arc<ProviderRegistry>,
    mode: TransportMode,
    proxy: Option<ProxyConfig>,
    store: Arc<dyn CredentialStore>,
    /// Shared server-side keys a deployment may hand to the factory so that
    /// users without their own key can still run in direct mode.
    shared_credentials: HashMap<ProviderId, ProviderCredentials>,
}

impl ClientFactory {
    pub fn new(mode: TransportMode, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            registry: Arc::new(ProviderRegistry::builtin()),
            mode,
            proxy: None,
            store,
            shared_credentials: HashMap::new(),
        }
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Replaces the built-in registry. Used by deployments that overlay
    /// custom descriptors, and by tests.
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_shared_credentials(
        mut self,
        provider: ProviderId,
        credentials: ProviderCredentials,
    ) -> Self {
        self.shared_credentials.insert(provider, credentials);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Builds a client for one call, deciding the transport as described in
    /// the module docs.
    pub async fn client_for(
        &self,
        provider: ProviderId,
        options: GenerateOptions,
    ) -> Result<CompletionClient, DispatchError> {
        let descriptor = self
            .registry
            .get_provider(provider)
            .filter(|descriptor| descriptor.is_available)
            .ok_or_else(|| DispatchError::UnknownProvider(provider.to_string()))?
            .clone();
        descriptor.validate()?;

        if self.mode == TransportMode::Proxy {
            if let Some(transport) = self.healthy_proxy().await {
                info!(provider = %provider, "dispatching via server proxy");
                return Ok(CompletionClient {
                    descriptor,
                    transport: Box::new(transport),
                    options,
                });
            }
        }

        self.direct_client(descriptor, options).await
    }

    /// The bring-your-own-key entry point: uses this user's stored key when
    /// present, otherwise the shared server-side key. In proxy mode the
    /// `useUserKey` flag tells the server which of its stored copies to
    /// decrypt.
    pub async fn client_for_user(
        &self,
        provider: ProviderId,
        user_id: &str,
        mut options: GenerateOptions,
    ) -> Result<CompletionClient, DispatchError> {
        options.user_id = Some(user_id.to_string());
        options.use_user_key = match self.store.get(provider).await? {
            Some(_) => {
                self.store.touch_last_used(provider).await?;
                true
            }
            None => false,
        };
        debug!(
            provider = %provider,
            use_user_key = options.use_user_key,
            "resolved key ownership for user call"
        );
        self.client_for(provider, options).await
    }

    /// Returns a proxy transport only when the proxy is configured and its
    /// health probe reports both available and authenticated.
    async fn healthy_proxy(&self) -> Option<ProxyTransport> {
        let config = match &self.proxy {
            Some(config) if config.is_configured() => config.clone(),
            _ => {
                warn!("server mode is preferred but no proxy is configured; falling back to direct dispatch");
                return None;
            }
        };

        let transport = match ProxyTransport::new(config) {
            Ok(transport) => transport,
            Err(e) => {
                warn!("could not construct proxy transport: {e}; falling back to direct dispatch");
                return None;
            }
        };

        let health = transport.health().await;
        if health.healthy() {
            return Some(transport);
        }
        warn!(
            available = health.available,
            authenticated = health.authenticated,
            "server proxy is unhealthy; falling back to direct dispatch"
        );
        for error in &health.errors {
            debug!("proxy health error: {error}");
        }
        None
    }

    /// Direct mode requires a credential: the user's stored one (touching
    /// its last-used timestamp), else a shared key, else a terminal
    /// missing-credentials error.
    async fn direct_client(
        &self,
        descriptor: ProviderDescriptor,
        options: GenerateOptions,
    ) -> Result<CompletionClient, DispatchError> {
        let provider = descriptor.id;
        let credentials = match self.store.get(provider).await? {
            Some(stored) => {
                self.store.touch_last_used(provider).await?;
                stored.credentials
            }
            None => self
                .shared_credentials
                .get(&provider)
                .cloned()
                .ok_or_else(|| DispatchError::MissingCredentials {
                    provider: provider.to_string(),
                })?,
        };

        let transport = DirectTransport::new(descriptor.clone(), credentials)?;
        Ok(CompletionClient {
            descriptor,
            transport: Box::new(transport),
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;

    #[tokio::test]
    async fn direct_mode_without_a_stored_key_is_a_terminal_error() {
        let factory = ClientFactory::new(
            TransportMode::Direct,
            Arc::new(MemoryCredentialStore::new()),
        );
        let err = factory
            .client_for(ProviderId::OpenAi, GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::MissingCredentials { .. }));
        assert!(err.to_string().contains("Add your API key"));
    }

    #[tokio::test]
    async fn direct_mode_uses_the_stored_key_and_touches_it() {
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .put(ProviderId::OpenAi, ProviderCredentials::new("sk-stored"))
            .await
            .unwrap();

        let factory = ClientFactory::new(TransportMode::Direct, store.clone());
        let client = factory
            .client_for(ProviderId::OpenAi, GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(client.descriptor().id, ProviderId::OpenAi);

        let stored = store.get(ProviderId::OpenAi).await.unwrap().unwrap();
        assert!(stored.last_used.is_some());
    }

    #[tokio::test]
    async fn proxy_preference_without_configuration_falls_back_to_direct() {
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .put(ProviderId::Gemini, ProviderCredentials::new("g-key"))
            .await
            .unwrap();

        let factory = ClientFactory::new(TransportMode::Proxy, store)
            .with_proxy(ProxyConfig::new("https://your-project.supabase.co/functions/v1"));
        // Placeholder proxy URL means fallback, and the stored key makes the
        // direct fallback succeed.
        let client = factory
            .client_for(ProviderId::Gemini, GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(client.descriptor().id, ProviderId::Gemini);
    }

    #[tokio::test]
    async fn shared_credentials_back_users_without_their_own_key() {
        let factory = ClientFactory::new(
            TransportMode::Direct,
            Arc::new(MemoryCredentialStore::new()),
        )
        .with_shared_credentials(ProviderId::Anthropic, ProviderCredentials::new("shared"));

        let client = factory
            .client_for_user(ProviderId::Anthropic, "user-1", GenerateOptions::default())
            .await
            .unwrap();
        // No stored key for this user, so the shared key backs the call.
        assert_eq!(client.descriptor().id, ProviderId::Anthropic);
    }
}
