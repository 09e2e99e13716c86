//! # Credential Storage
//!
//! Bring-your-own-key support. Credentials are held in memory only for the
//! duration of one request: a transport asks the store for them immediately
//! before use and never logs them. The store itself is a collaborator — the
//! CLI backs it with the OS keyring, tests with the in-memory implementation
//! here.

use crate::errors::DispatchError;
use crate::registry::{CredentialField, ProviderDescriptor, ProviderId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The secret values a provider needs. `project_id` is only populated for
/// WatsonX.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl ProviderCredentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: None,
        }
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}

// Secrets stay out of debug output and logs.
impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_key", &"<redacted>")
            .field("project_id", &self.project_id.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A stored credential entry plus its bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub credentials: ProviderCredentials,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

/// What `list` exposes: enough for a settings screen, no secrets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub provider: ProviderId,
    pub last_used: Option<DateTime<Utc>>,
}

/// A per-provider credential store, encrypted at rest by its implementation.
#[async_trait]
pub trait CredentialStore: Send + Sync + fmt::Debug {
    async fn get(&self, provider: ProviderId) -> Result<Option<StoredCredentials>, DispatchError>;

    async fn put(
        &self,
        provider: ProviderId,
        credentials: ProviderCredentials,
    ) -> Result<(), DispatchError>;

    async fn delete(&self, provider: ProviderId) -> Result<(), DispatchError>;

    async fn list(&self) -> Result<Vec<CredentialSummary>, DispatchError>;

    /// Records that the stored entry was just used.
    async fn touch_last_used(&self, provider: ProviderId) -> Result<(), DispatchError>;
}

/// Checks that every required credential field of `descriptor` is present
/// and non-empty.
pub fn validate_for(
    descriptor: &ProviderDescriptor,
    credentials: &ProviderCredentials,
) -> Result<(), DispatchError> {
    for requirement in &descriptor.key_requirements {
        if !requirement.required {
            continue;
        }
        let present = match requirement.field {
            CredentialField::ApiKey => !credentials.api_key.trim().is_empty(),
            CredentialField::ProjectId => credentials
                .project_id
                .as_deref()
                .is_some_and(|id| !id.trim().is_empty()),
        };
        if !present {
            return Err(DispatchError::MissingCredentials {
                provider: descriptor.id.to_string(),
            });
        }
    }
    Ok(())
}

/// An in-memory store for tests and embedding scenarios where the host
/// application manages persistence itself.
#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    entries: Arc<RwLock<HashMap<ProviderId, StoredCredentials>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, provider: ProviderId) -> Result<Option<StoredCredentials>, DispatchError> {
        Ok(self.entries.read().await.get(&provider).cloned())
    }

    async fn put(
        &self,
        provider: ProviderId,
        credentials: ProviderCredentials,
    ) -> Result<(), DispatchError> {
        self.entries.write().await.insert(
            provider,
            StoredCredentials {
                credentials,
                last_used: None,
            },
        );
        Ok(())
    }

    async fn delete(&self, provider: ProviderId) -> Result<(), DispatchError> {
        self.entries.write().await.remove(&provider);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CredentialSummary>, DispatchError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .map(|(provider, stored)| CredentialSummary {
                provider: *provider,
                last_used: stored.last_used,
            })
            .collect())
    }

    async fn touch_last_used(&self, provider: ProviderId) -> Result<(), DispatchError> {
        if let Some(stored) = self.entries.write().await.get_mut(&provider) {
            stored.last_used = Some(Utc::now());
        }
        Ok(())
    }
}
