//! # modelshift-cli
//!
//! The command-line front-end for the ModelShift dispatch library: send a
//! prompt to one provider, compare several side by side, run a debate,
//! manage stored API keys, and flip the transport-mode preference.

mod config;
mod keystore;
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use modelshift::agents::AgentLibrary;
use modelshift::comparison::{compare, debate, DebateSide};
use modelshift::credentials::{CredentialStore, ProviderCredentials};
use modelshift::factory::ClientFactory;
use modelshift::registry::{CredentialField, ProviderId};
use modelshift::transport::{ProxyConfig, TransportMode};
use modelshift::types::GenerateOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to an alternative configuration file.
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one prompt to one provider
    Ask(AskArgs),
    /// Send the same prompt to several providers side by side
    Compare(CompareArgs),
    /// Run a two-sided debate between providers
    Debate(DebateArgs),
    /// Manage stored API keys
    Keys(KeysArgs),
    /// Show or set the transport-mode preference
    Mode(ModeArgs),
    /// List or inspect prompt agents
    Agents(AgentsArgs),
}

#[derive(Parser, Debug)]
struct AskArgs {
    /// Provider id: openai, gemini, anthropic (claude), or watsonx
    #[arg(long)]
    provider: String,
    /// Model override
    #[arg(long)]
    model: Option<String>,
    /// Run the prompt through a stored agent template
    #[arg(long)]
    agent: Option<String>,
    /// Extra generation parameters as a JSON object
    #[arg(long)]
    parameters: Option<String>,
    /// The prompt text
    prompt: String,
}

#[derive(Parser, Debug)]
struct CompareArgs {
    /// Comma-separated provider ids
    #[arg(long, value_delimiter = ',')]
    providers: Vec<String>,
    /// Run the prompt through a stored agent template
    #[arg(long)]
    agent: Option<String>,
    /// The prompt text
    prompt: String,
}

#[derive(Parser, Debug)]
struct DebateArgs {
    /// Provider arguing in favor
    #[arg(long)]
    pro: String,
    /// Provider arguing against
    #[arg(long)]
    con: String,
    /// Number of rounds
    #[arg(long, default_value_t = 2)]
    rounds: usize,
    /// The debate topic
    topic: String,
}

#[derive(Parser, Debug)]
struct KeysArgs {
    #[command(subcommand)]
    command: KeysCommands,
}

#[derive(Subcommand, Debug)]
enum KeysCommands {
    /// Store an API key for a provider in the OS keyring
    Set {
        provider: String,
        #[arg(long)]
        api_key: String,
        /// Required for WatsonX
        #[arg(long)]
        project_id: Option<String>,
    },
    /// Remove a stored key
    Rm { provider: String },
    /// List stored keys (providers and last-used times only)
    Ls,
}

#[derive(Parser, Debug)]
struct ModeArgs {
    #[command(subcommand)]
    command: ModeCommands,
}

#[derive(Subcommand, Debug)]
enum ModeCommands {
    /// Print the current preference
    Get,
    /// Set the preference: server (proxy) or browser (direct)
    Set { mode: String },
}

#[derive(Parser, Debug)]
struct AgentsArgs {
    #[command(subcommand)]
    command: AgentsCommands,
}

#[derive(Subcommand, Debug)]
enum AgentsCommands {
    /// List available agents
    Ls,
    /// Show one agent's template and defaults
    Show { id: String },
}

// --- Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let app_config = config::get_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask(args) => ask(&app_config, args).await,
        Commands::Compare(args) => run_compare(&app_config, args).await,
        Commands::Debate(args) => run_debate(&app_config, args).await,
        Commands::Keys(args) => keys(&app_config, args).await,
        Commands::Mode(args) => mode(&app_config, args),
        Commands::Agents(args) => agents(&app_config, args),
    }
}

// --- Shared Plumbing ---

/// Builds the session factory: persisted mode preference, proxy
/// configuration, keyring-backed credentials, and any shared keys from the
/// configuration file.
fn build_factory(app_config: &config::AppConfig) -> Result<ClientFactory> {
    let mode = config::read_mode_preference(&app_config.state_dir);
    let mut factory =
        ClientFactory::new(mode, Arc::new(keystore::KeyringCredentialStore::new()));

    if let Some(url) = &app_config.proxy_url {
        let mut proxy = ProxyConfig::new(url.clone());
        if let Some(secret) = &app_config.proxy_secret {
            proxy = proxy.with_shared_secret(secret.clone());
        }
        factory = factory.with_proxy(proxy);
    }

    for (provider, shared) in &app_config.shared_keys {
        let provider: ProviderId = provider.parse()?;
        let mut credentials = ProviderCredentials::new(shared.api_key.clone());
        if let Some(project_id) = &shared.project_id {
            credentials = credentials.with_project_id(project_id.clone());
        }
        factory = factory.with_shared_credentials(provider, credentials);
    }

    Ok(factory)
}

fn parse_parameters(raw: Option<&str>) -> Result<Option<serde_json::Value>> {
    let Some(raw) = raw else { return Ok(None) };
    let value: serde_json::Value =
        serde_json::from_str(raw).context("--parameters must be valid JSON")?;
    if !value.is_object() {
        bail!("--parameters must be a JSON object, e.g. '{{\"temperature\": 0.5}}'");
    }
    Ok(Some(value))
}

/// Resolves an optional agent: renders the prompt through its template and
/// lets the agent's defaults fill any gaps in the options.
fn apply_agent(
    library: &AgentLibrary,
    agent_id: Option<&str>,
    prompt: &str,
    options: &mut GenerateOptions,
) -> Result<String> {
    let Some(id) = agent_id else {
        return Ok(prompt.to_string());
    };
    let agent = library
        .get(id)
        .with_context(|| format!("no agent with id '{id}'; see `modelshift agents ls`"))?;
    options.agent_id = Some(agent.id.clone());
    if options.model.is_none() {
        options.model = agent.model.clone();
    }
    if options.parameters.is_none() {
        options.parameters = agent.parameters.clone();
    }
    Ok(agent.render(prompt))
}

// --- Command Handlers ---

async fn ask(app_config: &config::AppConfig, args: AskArgs) -> Result<()> {
    let factory = build_factory(app_config)?;
    let library = config::load_agents(&app_config.state_dir)?;

    let mut options = GenerateOptions {
        model: args.model,
        parameters: parse_parameters(args.parameters.as_deref())?,
        ..Default::default()
    };
    let prompt = apply_agent(&library, args.agent.as_deref(), &args.prompt, &mut options)?;

    let provider: ProviderId = args.provider.parse()?;
    let client = factory.client_for(provider, options).await?;
    let completion = client.generate(&prompt).await?;
    ui::print_completion(&completion);
    Ok(())
}

async fn run_compare(app_config: &config::AppConfig, args: CompareArgs) -> Result<()> {
    if args.providers.len() < 2 {
        bail!("compare needs at least two providers, e.g. --providers openai,gemini");
    }
    let providers: Vec<ProviderId> = args
        .providers
        .iter()
        .map(|raw| raw.parse())
        .collect::<Result<_, _>>()?;

    let factory = build_factory(app_config)?;
    let library = config::load_agents(&app_config.state_dir)?;
    let mut options = GenerateOptions::default();
    let prompt = apply_agent(&library, args.agent.as_deref(), &args.prompt, &mut options)?;

    let runs = compare(&factory, &providers, &prompt, &options).await;
    ui::print_comparison(factory.registry(), &runs);
    Ok(())
}

async fn run_debate(app_config: &config::AppConfig, args: DebateArgs) -> Result<()> {
    if args.rounds == 0 {
        bail!("a debate needs at least one round");
    }
    let factory = build_factory(app_config)?;
    let side_a = DebateSide::new(args.pro.parse::<ProviderId>()?, "Pro", format!("in favor of: {}", args.topic));
    let side_b = DebateSide::new(args.con.parse::<ProviderId>()?, "Con", format!("against: {}", args.topic));

    let transcript = debate(
        &factory,
        &side_a,
        &side_b,
        &args.topic,
        args.rounds,
        &GenerateOptions::default(),
    )
    .await;
    ui::print_debate(factory.registry(), &transcript);
    Ok(())
}

async fn keys(app_config: &config::AppConfig, args: KeysArgs) -> Result<()> {
    let store = keystore::KeyringCredentialStore::new();
    let factory = build_factory(app_config)?;
    let registry = factory.registry();

    match args.command {
        KeysCommands::Set {
            provider,
            api_key,
            project_id,
        } => {
            let provider: ProviderId = provider.parse()?;
            let descriptor = registry
                .get_provider(provider)
                .with_context(|| format!("no descriptor for provider '{provider}'"))?;
            if descriptor.requires(CredentialField::ProjectId) && project_id.is_none() {
                bail!("{} also needs --project-id", descriptor.display_name);
            }

            let mut credentials = ProviderCredentials::new(api_key);
            if let Some(project_id) = project_id {
                credentials = credentials.with_project_id(project_id);
            }
            store.put(provider, credentials).await?;
            println!("Stored key for {}.", descriptor.display_name);
        }
        KeysCommands::Rm { provider } => {
            let provider: ProviderId = provider.parse()?;
            store.delete(provider).await?;
            println!("Removed key for {provider}.");
        }
        KeysCommands::Ls => {
            let summaries = store.list().await?;
            ui::print_key_list(registry, &summaries);
        }
    }
    Ok(())
}

fn mode(app_config: &config::AppConfig, args: ModeArgs) -> Result<()> {
    match args.command {
        ModeCommands::Get => {
            let mode = config::read_mode_preference(&app_config.state_dir);
            println!("{mode}");
        }
        ModeCommands::Set { mode } => {
            let mode: TransportMode = mode.parse()?;
            config::write_mode_preference(&app_config.state_dir, mode)?;
            println!("Transport mode set to {mode}.");
        }
    }
    Ok(())
}

fn agents(app_config: &config::AppConfig, args: AgentsArgs) -> Result<()> {
    let library = config::load_agents(&app_config.state_dir)?;
    match args.command {
        AgentsCommands::Ls => ui::print_agents(&library),
        AgentsCommands::Show { id } => {
            let agent = library
                .get(&id)
                .with_context(|| format!("no agent with id '{id}'"))?;
            println!("{} ({})", agent.name, agent.id);
            if !agent.description.is_empty() {
                println!("{}", agent.description);
            }
            if let Some(provider) = agent.default_provider {
                println!("default provider: {provider}");
            }
            if let Some(model) = &agent.model {
                println!("model: {model}");
            }
            if let Some(parameters) = &agent.parameters {
                println!("parameters: {parameters}");
            }
            println!("\n{}", agent.template);
        }
    }
    Ok(())
}
