//! # Keyring Credential Store
//!
//! Backs the library's [`CredentialStore`] seam with the operating system
//! keyring, so bring-your-own keys are encrypted at rest by the platform.
//! Each provider gets one keyring entry holding a small JSON payload:
//! credentials plus the last-used timestamp.

use async_trait::async_trait;
use chrono::Utc;
use keyring::Entry;
use modelshift::credentials::{
    CredentialStore, CredentialSummary, ProviderCredentials, StoredCredentials,
};
use modelshift::errors::DispatchError;
use modelshift::registry::ProviderId;

const SERVICE: &str = "modelshift";

/// An OS-keyring-backed credential store.
#[derive(Debug, Default, Clone)]
pub struct KeyringCredentialStore;

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(provider: ProviderId) -> Result<Entry, DispatchError> {
        Entry::new(SERVICE, provider.as_str())
            .map_err(|e| DispatchError::CredentialStore(e.to_string()))
    }

    fn read(provider: ProviderId) -> Result<Option<StoredCredentials>, DispatchError> {
        match Self::entry(provider)?.get_password() {
            Ok(payload) => serde_json::from_str(&payload).map(Some).map_err(|e| {
                DispatchError::CredentialStore(format!(
                    "stored entry for {provider} is corrupt: {e}"
                ))
            }),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(DispatchError::CredentialStore(e.to_string())),
        }
    }

    fn write(provider: ProviderId, stored: &StoredCredentials) -> Result<(), DispatchError> {
        let payload = serde_json::to_string(stored)
            .map_err(|e| DispatchError::CredentialStore(e.to_string()))?;
        Self::entry(provider)?
            .set_password(&payload)
            .map_err(|e| DispatchError::CredentialStore(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn get(&self, provider: ProviderId) -> Result<Option<StoredCredentials>, DispatchError> {
        Self::read(provider)
    }

    async fn put(
        &self,
        provider: ProviderId,
        credentials: ProviderCredentials,
    ) -> Result<(), DispatchError> {
        Self::write(
            provider,
            &StoredCredentials {
                credentials,
                last_used: None,
            },
        )
    }

    async fn delete(&self, provider: ProviderId) -> Result<(), DispatchError> {
        match Self::entry(provider)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(DispatchError::CredentialStore(e.to_string())),
        }
    }

    async fn list(&self) -> Result<Vec<CredentialSummary>, DispatchError> {
        // The keyring cannot enumerate, so probe the known providers.
        let mut summaries = Vec::new();
        for provider in ProviderId::all() {
            if let Some(stored) = Self::read(provider)? {
                summaries.push(CredentialSummary {
                    provider,
                    last_used: stored.last_used,
                });
            }
        }
        Ok(summaries)
    }

    async fn touch_last_used(&self, provider: ProviderId) -> Result<(), DispatchError> {
        if let Some(mut stored) = Self::read(provider)? {
            stored.last_used = Some(Utc::now());
            Self::write(provider, &stored)?;
        }
        Ok(())
    }
}
