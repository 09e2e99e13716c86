//! # Transport Strategies
//!
//! A single strategy trait with two implementations: requests either go
//! through the trusted server proxy (credentials stay server-side) or
//! straight from this process to the provider's REST endpoint. The mode is a
//! persisted user preference, selected explicitly per call by the factory —
//! there is no runtime negotiation.

pub mod direct;
pub mod proxy;

use crate::errors::DispatchError;
use crate::types::{Completion, GenerateRequest};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt;
use std::str::FromStr;

pub use direct::DirectTransport;
pub use proxy::{HealthReport, ProxyConfig, ProxyTransport};

/// Which transport backs a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// Route through the server-side dispatch function. Preferred, because
    /// credentials never leave the server.
    #[default]
    Proxy,
    /// Call the provider directly with a locally stored credential.
    Direct,
}

impl TransportMode {
    /// The persisted preference string (`server` / `browser`), kept
    /// compatible with what the dashboard wrote to local storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Proxy => "server",
            TransportMode::Direct => "browser",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" | "proxy" => Ok(TransportMode::Proxy),
            "browser" | "direct" => Ok(TransportMode::Direct),
            other => Err(DispatchError::UnknownTransportMode(other.to_string())),
        }
    }
}

/// A transport turns one uniform request into one completed text response or
/// a classified failure. Implementations perform no retries.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug + DynClone {
    async fn generate(&self, request: &GenerateRequest) -> Result<Completion, DispatchError>;
}

dyn_clone::clone_trait_object!(Transport);
