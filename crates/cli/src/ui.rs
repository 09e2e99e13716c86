//! # Output Rendering
//!
//! Plain-text rendering for completions, comparison tables, debates, and
//! the key/agent listings. Everything user-facing goes through here so the
//! command handlers stay data-only.

use modelshift::agents::AgentLibrary;
use modelshift::comparison::ProviderRun;
use modelshift::credentials::CredentialSummary;
use modelshift::registry::ProviderRegistry;
use modelshift::types::{Completion, CompletionMetrics};

fn display_name(registry: &ProviderRegistry, run: &ProviderRun) -> String {
    registry
        .get_provider(run.provider)
        .map(|descriptor| descriptor.display_name.to_string())
        .unwrap_or_else(|| run.provider.to_string())
}

fn metrics_line(metrics: &CompletionMetrics) -> String {
    format!(
        "{} ms · ~{} tokens · ~${:.5}",
        metrics.latency_ms, metrics.tokens, metrics.cost
    )
}

pub fn print_completion(completion: &Completion) {
    println!("{}", completion.text);
    if let Some(metrics) = &completion.metrics {
        println!("\n[{}]", metrics_line(metrics));
    }
}

pub fn print_comparison(registry: &ProviderRegistry, runs: &[ProviderRun]) {
    for run in runs {
        println!("=== {} ===", display_name(registry, run));
        match (&run.text, &run.error) {
            (Some(text), _) => {
                println!("{text}");
                if let Some(metrics) = &run.metrics {
                    println!("[{}]", metrics_line(metrics));
                }
            }
            (None, Some(error)) => println!("FAILED: {error}"),
            (None, None) => println!("(no result)"),
        }
        println!();
    }

    let succeeded = runs.iter().filter(|run| run.succeeded()).count();
    println!("{succeeded}/{} providers answered", runs.len());
}

pub fn print_debate(registry: &ProviderRegistry, transcript: &[ProviderRun]) {
    // Two turns per round, in order.
    for (index, turn) in transcript.iter().enumerate() {
        if index % 2 == 0 {
            println!("--- Round {} ---", index / 2 + 1);
        }
        let speaker = turn.label.clone().unwrap_or_else(|| turn.provider.to_string());
        match (&turn.text, &turn.error) {
            (Some(text), _) => println!("{speaker} ({}):\n{text}\n", display_name(registry, turn)),
            (None, Some(error)) => println!("{speaker}: (failed: {error})\n"),
            (None, None) => println!("{speaker}: (no response)\n"),
        }
    }
}

pub fn print_key_list(registry: &ProviderRegistry, summaries: &[CredentialSummary]) {
    if summaries.is_empty() {
        println!("No stored API keys. Add one with `modelshift keys set <provider> --api-key ...`.");
        return;
    }
    for summary in summaries {
        let name = registry
            .get_provider(summary.provider)
            .map(|descriptor| descriptor.display_name)
            .unwrap_or("unknown");
        match summary.last_used {
            Some(at) => println!("{:<12} {:<18} last used {}", summary.provider, name, at.to_rfc3339()),
            None => println!("{:<12} {:<18} never used", summary.provider, name),
        }
    }
}

pub fn print_agents(library: &AgentLibrary) {
    for agent in library.list() {
        println!("{:<16} {:<20} {}", agent.id, agent.name, agent.description);
    }
}
