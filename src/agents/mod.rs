//! Research agents
//!
//! Every agent is a stateless function over explicit inputs. The four agents
//! that need a language model share one capability, [`AgentRuntime::complete`],
//! and differ only in their prompt template and output parser:
//!
//! | Agent | Role | Model calls |
//! |-------|------|-------------|
//! | [`gap`] | [`AgentRole::GapAnalyst`] | 0 or 1 |
//! | [`planner`] | [`AgentRole::Planner`] | 1 |
//! | [`researcher`] | - | 0 (web search only) |
//! | [`editor`] | [`AgentRole::Editor`] | 1 |
//! | [`comparison`] | [`AgentRole::Comparator`] | 1 |

pub mod comparison;
pub mod editor;
pub mod gap;
pub mod planner;
pub mod researcher;

use crate::llm::LLMClient;
use crate::types::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    GapAnalyst,
    Planner,
    Editor,
    Comparator,
}

const GAP_ANALYST_PROMPT: &str = r#"You are a research analyst reviewing an existing research document against a research topic.
Identify what the document is missing, what it covers too thinly, and what it should improve.
Be specific and actionable: each item must name a concrete angle someone could search for.
Respond with JSON only."#;

const PLANNER_PROMPT: &str = r#"You are a research coordinator. Turn a research topic, and any known gaps in existing work, into a focused web research plan.
Write search queries a search engine will answer well: short, specific, no duplicates, most important first.
Respond with JSON only."#;

const EDITOR_PROMPT: &str = r#"You are a senior researcher writing a comprehensive, well-structured research report in markdown.
Use only the numbered facts you are given. Cite facts inline as [F<number>] and never cite a fact number that was not provided.
Organise the report into clear sections with descriptive headings.
Respond with JSON only."#;

const COMPARATOR_PROMPT: &str = r#"You are a research analyst comparing an original research document with a newly written report on the same topic.
Be objective: summarise the original, list what the new report does better, what it still misses, and what new insights it adds.
Respond with JSON only."#;

impl AgentRole {
    pub fn name(&self) -> &'static str {
        match self {
            AgentRole::GapAnalyst => "gap_analyst",
            AgentRole::Planner => "planner",
            AgentRole::Editor => "editor",
            AgentRole::Comparator => "comparator",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentRole::GapAnalyst => GAP_ANALYST_PROMPT,
            AgentRole::Planner => PLANNER_PROMPT,
            AgentRole::Editor => EDITOR_PROMPT,
            AgentRole::Comparator => COMPARATOR_PROMPT,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The shared model capability handed to every agent.
#[derive(Clone)]
pub struct AgentRuntime {
    llm: Arc<dyn LLMClient>,
    timeout: Duration,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LLMClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Run one role-specific completion with a bounded wait.
    pub async fn complete(
        &self,
        role: AgentRole,
        prompt: &str,
        context: Option<&str>,
    ) -> Result<String> {
        debug!(
            role = %role,
            model = %self.llm.model_name(),
            prompt_chars = prompt.len(),
            "Calling language model"
        );

        match tokio::time::timeout(self.timeout, self.llm.complete(role, prompt, context)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::ProviderTimeout {
                operation: format!("{} completion", role),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

/// Locate the JSON payload inside a model response.
///
/// Models often wrap JSON in prose or a fenced code block; this returns the
/// slice from the first `{` or `[` to the matching last `}` or `]`.
pub(crate) fn extract_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closing = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closing)?;
    (end > start).then(|| &text[start..=end])
}

/// Parse the JSON payload of a model response into `T`.
pub(crate) fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let payload = extract_json(text)
        .ok_or_else(|| AppError::Parse("response contains no JSON object".to_string()))?;
    serde_json::from_str(payload).map_err(|e| AppError::Parse(e.to_string()))
}

/// Strip list numbering and bullets ("1.", "2)", "-", "*") from a line.
pub(crate) fn strip_list_marker(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| c.is_numeric() || c == '.' || c == ')')
        .trim_start_matches(['-', '*', '•'])
        .trim()
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Collapse whitespace and trim list debris from a free-text item.
pub(crate) fn clean_item(item: &str) -> String {
    strip_list_marker(item)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
