//! # Comparison & Debate Fan-Out
//!
//! Multi-provider runs: issue one call per selected provider concurrently
//! and join on an all-complete barrier. Each call's failure is isolated into
//! its own result slot — one provider erroring never cancels or blocks the
//! others. Results come back in the caller's provider order; completion
//! order is unobservable.

use crate::errors::DispatchError;
use crate::factory::ClientFactory;
use crate::registry::ProviderId;
use crate::types::{Completion, CompletionMetrics, GenerateOptions};
use futures::future::join_all;
use serde::Serialize;
use tracing::info;

/// The outcome of one provider's call within a comparison or debate.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRun {
    pub provider: ProviderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<CompletionMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ProviderRun {
    fn from_outcome(
        provider: ProviderId,
        label: Option<String>,
        outcome: Result<Completion, DispatchError>,
    ) -> Self {
        match outcome {
            Ok(completion) => Self {
                provider,
                text: Some(completion.text),
                error: None,
                metrics: completion.metrics,
                label,
            },
            Err(e) => Self {
                provider,
                text: None,
                error: Some(e.to_string()),
                metrics: None,
                label,
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        self.text.is_some()
    }
}

async fn run_one(
    factory: &ClientFactory,
    provider: ProviderId,
    prompt: &str,
    options: GenerateOptions,
    label: Option<String>,
) -> ProviderRun {
    let outcome = async {
        let client = factory.client_for(provider, options).await?;
        client.generate(prompt).await
    }
    .await;
    ProviderRun::from_outcome(provider, label, outcome)
}

/// Sends the same prompt to every selected provider concurrently.
pub async fn compare(
    factory: &ClientFactory,
    providers: &[ProviderId],
    prompt: &str,
    options: &GenerateOptions,
) -> Vec<ProviderRun> {
    info!(count = providers.len(), "fanning out comparison");
    let calls = providers
        .iter()
        .map(|&provider| run_one(factory, provider, prompt, options.clone(), None));
    join_all(calls).await
}

/// One participant in a debate.
#[derive(Debug, Clone)]
pub struct DebateSide {
    pub provider: ProviderId,
    pub label: String,
    pub stance: String,
}

impl DebateSide {
    pub fn new(provider: ProviderId, label: impl Into<String>, stance: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
            stance: stance.into(),
        }
    }
}

/// Runs a side-by-side debate: each round, both sides respond concurrently
/// to the transcript so far, then the round's turns are appended (first side
/// first). A failed turn records its error and the debate carries on.
pub async fn debate(
    factory: &ClientFactory,
    side_a: &DebateSide,
    side_b: &DebateSide,
    topic: &str,
    rounds: usize,
    options: &GenerateOptions,
) -> Vec<ProviderRun> {
    let mut transcript: Vec<ProviderRun> = Vec::new();

    for round in 0..rounds {
        info!(round = round + 1, "debate round starting");
        let prompt_a = debate_prompt(topic, side_a, round, &transcript);
        let prompt_b = debate_prompt(topic, side_b, round, &transcript);

        let (turn_a, turn_b) = futures::join!(
            run_one(
                factory,
                side_a.provider,
                &prompt_a,
                options.clone(),
                Some(side_a.label.clone()),
            ),
            run_one(
                factory,
                side_b.provider,
                &prompt_b,
                options.clone(),
                Some(side_b.label.clone()),
            ),
        );
        transcript.push(turn_a);
        transcript.push(turn_b);
    }

    transcript
}

fn debate_prompt(
    topic: &str,
    side: &DebateSide,
    round: usize,
    transcript: &[ProviderRun],
) -> String {
    let mut prompt = format!(
        "You are taking part in a structured debate.\n\
         Topic: {topic}\n\
         Your position: {stance}\n\
         This is round {round_number}. Argue your position in under 150 words. \
         Address the strongest point made against you so far, if any.",
        stance = side.stance,
        round_number = round + 1,
    );

    if !transcript.is_empty() {
        prompt.push_str("\n\nDebate so far:\n");
        for turn in transcript {
            let speaker = turn.label.as_deref().unwrap_or("unknown");
            match &turn.text {
                Some(text) => prompt.push_str(&format!("{speaker}: {text}\n")),
                None => prompt.push_str(&format!("{speaker}: (no response this turn)\n")),
            }
        }
    }

    prompt
}
