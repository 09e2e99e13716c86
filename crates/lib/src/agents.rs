//! # Prompt Agents
//!
//! User-defined prompt templates with `{placeholder}` substitution. An agent
//! pairs a template with optional provider/model/parameter defaults, so "run
//! the summarizer against Gemini" is one call. The library ships a few
//! starter agents and round-trips through YAML so a front-end can persist a
//! user's own.

use crate::errors::DispatchError;
use crate::registry::ProviderId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A reusable prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptAgent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// The template text. `{input}` receives the user's prompt; other
    /// `{name}` placeholders can be filled via [`render_with`](Self::render_with).
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<ProviderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl PromptAgent {
    /// Renders the template against the user's input.
    ///
    /// Lenient policy: unknown placeholders pass through untouched, and a
    /// template that never mentions `{input}` gets the input appended so the
    /// prompt is never silently dropped.
    pub fn render(&self, input: &str) -> String {
        let rendered = self.render_with(&[("input", input)]);
        if self.template.contains("{input}") {
            rendered
        } else {
            format!("{rendered}\n\n{input}")
        }
    }

    /// Renders the template with an explicit set of placeholder values.
    pub fn render_with(&self, vars: &[(&str, &str)]) -> String {
        let re = Regex::new(r"\{([A-Za-z0-9_]+)\}").unwrap();
        re.replace_all(&self.template, |caps: &regex::Captures| {
            let name = &caps[1];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
    }
}

/// An in-memory collection of agents with YAML persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentLibrary {
    agents: Vec<PromptAgent>,
}

impl AgentLibrary {
    pub fn new(agents: Vec<PromptAgent>) -> Self {
        Self { agents }
    }

    /// The starter agents every fresh installation sees.
    pub fn builtin() -> Self {
        Self {
            agents: vec![
                PromptAgent {
                    id: "summarizer".to_string(),
                    name: "Summarizer".to_string(),
                    description: "Condense any text into a few bullet points".to_string(),
                    template: "Summarize the following text in at most five bullet points. \
                               Keep each bullet under twenty words.\n\n{input}"
                        .to_string(),
                    default_provider: None,
                    model: None,
                    parameters: None,
                },
                PromptAgent {
                    id: "explainer".to_string(),
                    name: "Explainer".to_string(),
                    description: "Explain a concept for a newcomer".to_string(),
                    template: "Explain the following to someone new to the subject, using one \
                               concrete analogy:\n\n{input}"
                        .to_string(),
                    default_provider: None,
                    model: None,
                    parameters: None,
                },
                PromptAgent {
                    id: "code-reviewer".to_string(),
                    name: "Code Reviewer".to_string(),
                    description: "Review a code snippet for bugs and clarity".to_string(),
                    template: "Review this code. List concrete bugs first, then style issues. \
                               Quote the offending line for each finding.\n\n{input}"
                        .to_string(),
                    default_provider: None,
                    model: None,
                    parameters: Some(serde_json::json!({"temperature": 0.2})),
                },
            ],
        }
    }

    pub fn list(&self) -> &[PromptAgent] {
        &self.agents
    }

    pub fn get(&self, id: &str) -> Option<&PromptAgent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    /// Inserts or replaces the agent with the same id.
    pub fn upsert(&mut self, agent: PromptAgent) {
        match self.agents.iter_mut().find(|existing| existing.id == agent.id) {
            Some(existing) => *existing = agent,
            None => self.agents.push(agent),
        }
    }

    /// Removes an agent; returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.agents.len();
        self.agents.retain(|agent| agent.id != id);
        self.agents.len() != before
    }

    pub fn from_yaml(content: &str) -> Result<Self, DispatchError> {
        serde_yaml::from_str(content).map_err(|e| DispatchError::Agent(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, DispatchError> {
        serde_yaml::to_string(self).map_err(|e| DispatchError::Agent(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_with_template(template: &str) -> PromptAgent {
        PromptAgent {
            id: "t".to_string(),
            name: "t".to_string(),
            description: String::new(),
            template: template.to_string(),
            default_provider: None,
            model: None,
            parameters: None,
        }
    }

    #[test]
    fn render_substitutes_the_input_placeholder() {
        let agent = agent_with_template("Summarize:\n{input}");
        assert_eq!(agent.render("the text"), "Summarize:\nthe text");
    }

    #[test]
    fn render_appends_input_when_the_template_never_mentions_it() {
        let agent = agent_with_template("You are a poet.");
        assert_eq!(agent.render("roses"), "You are a poet.\n\nroses");
    }

    #[test]
    fn unknown_placeholders_pass_through() {
        let agent = agent_with_template("{tone} take on {input} with {unfilled}");
        let rendered = agent.render_with(&[("tone", "wry"), ("input", "cats")]);
        assert_eq!(rendered, "wry take on cats with {unfilled}");
    }

    #[test]
    fn library_round_trips_through_yaml() {
        let library = AgentLibrary::builtin();
        let yaml = library.to_yaml().unwrap();
        let restored = AgentLibrary::from_yaml(&yaml).unwrap();
        assert_eq!(restored.list().len(), library.list().len());
        assert!(restored.get("summarizer").is_some());
    }

    #[test]
    fn upsert_replaces_by_id_and_remove_reports_presence() {
        let mut library = AgentLibrary::builtin();
        let count = library.list().len();

        let mut replacement = library.get("summarizer").unwrap().clone();
        replacement.name = "Shorter Summarizer".to_string();
        library.upsert(replacement);
        assert_eq!(library.list().len(), count);
        assert_eq!(library.get("summarizer").unwrap().name, "Shorter Summarizer");

        assert!(library.remove("summarizer"));
        assert!(!library.remove("summarizer"));
    }
}
