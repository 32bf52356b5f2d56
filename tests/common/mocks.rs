//! Mock implementations for testing.
//!
//! Scripted LLM and search providers shared by the integration tests. The
//! LLM mock recognises which agent is calling by its system prompt, so one
//! client can drive a whole run.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use scrivener::agents::AgentRole;
use scrivener::llm::LLMClient;
use scrivener::tools::{SearchProvider, SearchStream};
use scrivener::types::{AppError, Result, SearchHit};
use scrivener::utils::config::ResearchConfig;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ROLES: [AgentRole; 4] = [
    AgentRole::GapAnalyst,
    AgentRole::Planner,
    AgentRole::Editor,
    AgentRole::Comparator,
];

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail,
    Hang,
}

/// Mock LLM client with one scripted reply per agent role.
///
/// # Examples
///
/// ```ignore
/// let llm = MockLLMClient::new()
///     .reply(AgentRole::Planner, &planner_json(&["query one"]))
///     .fail(AgentRole::Editor);
/// ```
#[derive(Default)]
pub struct MockLLMClient {
    replies: HashMap<AgentRole, Reply>,
    calls: Mutex<Vec<AgentRole>>,
    prompts: Mutex<Vec<(AgentRole, String)>>,
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every agent returns well-formed output.
    pub fn happy() -> Self {
        Self::new()
            .reply(AgentRole::GapAnalyst, &gaps_json())
            .reply(
                AgentRole::Planner,
                &planner_json(&["storage costs", "storage capacity", "storage policy"]),
            )
            .reply(AgentRole::Editor, &editor_json())
            .reply(AgentRole::Comparator, &comparison_json(72.0))
    }

    pub fn reply(mut self, role: AgentRole, text: &str) -> Self {
        self.replies.insert(role, Reply::Text(text.to_string()));
        self
    }

    pub fn fail(mut self, role: AgentRole) -> Self {
        self.replies.insert(role, Reply::Fail);
        self
    }

    /// Never answer, so only a timeout or cancellation ends the call.
    pub fn hang(mut self, role: AgentRole) -> Self {
        self.replies.insert(role, Reply::Hang);
        self
    }

    pub fn calls(&self, role: AgentRole) -> usize {
        self.calls.lock().iter().filter(|r| **r == role).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Prompts received by `role`, in call order.
    pub fn prompts(&self, role: AgentRole) -> Vec<String> {
        self.prompts
            .lock()
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(AppError::LLM("Mock LLM expects a system prompt".to_string()))
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let role = ROLES
            .into_iter()
            .find(|role| role.system_prompt() == system)
            .ok_or_else(|| AppError::LLM("Mock LLM: unknown system prompt".to_string()))?;

        self.calls.lock().push(role);
        self.prompts.lock().push((role, prompt.to_string()));

        match self.replies.get(&role).cloned() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail) | None => Err(AppError::LLM(format!("Mock LLM failure for {}", role))),
            Some(Reply::Hang) => std::future::pending().await,
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Mock search provider with per-query scripted results.
///
/// Queries without a script get `generated` unique hits each.
#[derive(Default)]
pub struct MockSearchProvider {
    results: HashMap<String, Vec<SearchHit>>,
    failures: HashSet<String>,
    hangs: HashSet<String>,
    generated: usize,
    delay: Option<Duration>,
    cancel_on: Option<(String, CancellationToken)>,
    searched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every unscripted query returns `n` hits unique to that query.
    pub fn generating(n: usize) -> Self {
        Self {
            generated: n,
            ..Self::default()
        }
    }

    pub fn with_results(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.results.insert(query.to_string(), hits);
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failures.insert(query.to_string());
        self
    }

    pub fn hanging_on(mut self, query: &str) -> Self {
        self.hangs.insert(query.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Cancel `token` as soon as `query` is searched.
    pub fn cancelling_on(mut self, query: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((query.to_string(), token));
        self
    }

    pub fn searched(&self) -> Vec<String> {
        self.searched.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn name(&self) -> &str {
        "mock_search"
    }

    async fn search(&self, query: &str) -> Result<SearchStream> {
        self.searched.lock().push(query.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some((trigger, token)) = &self.cancel_on {
            if trigger == query {
                token.cancel();
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.hangs.contains(query) {
            std::future::pending::<()>().await;
        }
        if self.failures.contains(query) {
            return Err(AppError::Search(format!("Mock search failure for '{}'", query)));
        }

        let hits = match self.results.get(query) {
            Some(hits) => hits.clone(),
            None => (1..=self.generated)
                .map(|i| {
                    hit(
                        &format!("{} result {}", query, i),
                        &format!("https://example.com/{}/{}", query.replace(' ', "-"), i),
                        &format!("Finding {} about {}.", i, query),
                    )
                })
                .collect(),
        };

        Ok(stream::iter(hits.into_iter().map(Ok)).boxed())
    }
}

pub fn hit(title: &str, url: &str, snippet: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
    }
}

/// Research settings sized for tests: short timeouts, tiny length target.
pub fn test_config() -> ResearchConfig {
    ResearchConfig {
        concurrency: 2,
        results_per_query: 3,
        search_timeout_secs: 5,
        llm_timeout_secs: 5,
        target_words: 5,
        ..ResearchConfig::default()
    }
}

pub fn shared(llm: MockLLMClient) -> Arc<MockLLMClient> {
    Arc::new(llm)
}

// ============= Canned agent output =============

pub fn gaps_json() -> String {
    r#"{"gaps": ["No cost comparison"], "improvements": ["Figures are from 2019"], "areas_to_expand": ["Recycling"]}"#
        .to_string()
}

pub fn planner_json(queries: &[&str]) -> String {
    let items: Vec<String> = queries
        .iter()
        .map(|q| format!(r#"{{"text": "{}", "rationale": "coverage"}}"#, q))
        .collect();
    format!(
        r#"{{"queries": [{}], "focus_areas": ["costs"]}}"#,
        items.join(", ")
    )
}

pub fn editor_json() -> String {
    r#"{"title": "Energy Storage Report", "sections": [
        {"heading": "Overview", "body": "Storage deployments are growing quickly [F1].", "citations": [1]},
        {"heading": "Outlook", "body": "Further growth is expected across markets [F2].", "citations": [2]}
    ]}"#
    .to_string()
}

pub fn comparison_json(score: f64) -> String {
    format!(
        r#"{{"summary": "An older survey", "strengths": ["More recent data"], "gaps": ["Little policy detail"],
            "new_insights": ["Market growth"], "quality_assessment": "Better sourced", "depth_increase": "Moderate",
            "score": {}}}"#,
        score
    )
}
