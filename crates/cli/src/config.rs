//! # CLI Configuration & Local State
//!
//! Loads the CLI's configuration from an optional `modelshift.yml` (with
//! `${VAR}` environment substitution) layered under `MODELSHIFT_*`
//! environment variables, and manages the small pieces of local state the
//! dashboard kept in browser storage: the transport-mode preference and the
//! user's agent library.

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use modelshift::agents::AgentLibrary;
use modelshift::transport::TransportMode;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The root CLI configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Base URL of the server-side dispatch function, when a deployment has
    /// one. Loaded from `MODELSHIFT_PROXY_URL` or `modelshift.yml`.
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// Bearer token for the proxy itself.
    #[serde(default)]
    pub proxy_secret: Option<String>,
    /// Where the mode preference and agent library live.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    /// Shared (deployment-wide) provider keys for users without their own,
    /// keyed by provider id.
    #[serde(default)]
    pub shared_keys: HashMap<String, SharedKey>,
}

/// One shared provider credential from the configuration file.
#[derive(Debug, Deserialize, Clone)]
pub struct SharedKey {
    pub api_key: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_state_dir() -> String {
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.modelshift")
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>> {
    if !Path::new(path).exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read config file '{path}'"))?;
    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").unwrap();
    let expanded = re.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });
    Ok(Some(expanded.to_string()))
}

/// Loads the CLI configuration.
///
/// Layering, lowest to highest: programmatic defaults, the YAML file (if
/// present), then `MODELSHIFT_*` environment variables (e.g.
/// `MODELSHIFT_PROXY_URL`, `MODELSHIFT_SHARED_KEYS__OPENAI__API_KEY`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig> {
    let mut builder =
        ConfigBuilder::builder().set_default("state_dir", default_state_dir())?;

    let config_path = config_path_override.unwrap_or("modelshift.yml");
    if let Some(content) = read_and_substitute(config_path)? {
        info!("loading configuration from '{config_path}'");
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        .add_source(
            Environment::with_prefix("MODELSHIFT")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize().context("invalid configuration")
}

fn mode_file(state_dir: &str) -> PathBuf {
    Path::new(state_dir).join("mode")
}

/// Reads the persisted transport-mode preference, defaulting to server mode
/// when nothing (or something unreadable) is stored.
pub fn read_mode_preference(state_dir: &str) -> TransportMode {
    match fs::read_to_string(mode_file(state_dir)) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("ignoring stored transport mode: {e}");
            TransportMode::default()
        }),
        Err(_) => TransportMode::default(),
    }
}

/// Persists the transport-mode preference as its `server`/`browser` string.
pub fn write_mode_preference(state_dir: &str, mode: TransportMode) -> Result<()> {
    fs::create_dir_all(state_dir)
        .with_context(|| format!("could not create state directory '{state_dir}'"))?;
    fs::write(mode_file(state_dir), mode.as_str()).context("could not persist mode preference")
}

fn agents_file(state_dir: &str) -> PathBuf {
    Path::new(state_dir).join("agents.yml")
}

/// Loads the user's agent library, falling back to the built-in starters.
pub fn load_agents(state_dir: &str) -> Result<AgentLibrary> {
    let path = agents_file(state_dir);
    if !path.exists() {
        return Ok(AgentLibrary::builtin());
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    AgentLibrary::from_yaml(&content)
        .with_context(|| format!("'{}' is not a valid agent library", path.display()))
}
