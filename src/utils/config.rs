//! Configuration for Scrivener
//!
//! Settings come from an optional TOML file (`scrivener.toml`); every key has
//! a default, so the file may be absent. The only required setting is the
//! language model credential, which is read from the environment variable
//! named by `llm.api_key_env` (a `.env` file is honoured).

use crate::llm::Provider;
use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure loaded from scrivener.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Resolved from `api_key_env` at load time, never read from the file
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_provider() -> ProviderKind {
    ProviderKind::OpenAI
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    180
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout_secs(),
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the provider description for the LLM client factory.
    pub fn provider(&self) -> Result<Provider> {
        match self.provider {
            ProviderKind::OpenAI => {
                let api_key = self.api_key.clone().ok_or_else(|| {
                    AppError::Configuration(format!("{} is not set", self.api_key_env))
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: self.api_base.clone(),
                    model: self.model.clone(),
                    timeout: self.timeout(),
                })
            }
            ProviderKind::Ollama => Ok(Provider::Ollama {
                base_url: self.api_base.clone(),
                model: self.model.clone(),
            }),
        }
    }
}

// ============= Research Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Upper bound on gaps kept from the gap analysis
    #[serde(default = "default_max_gaps")]
    pub max_gaps: usize,

    /// Number of queries the planner is asked for at minimum
    #[serde(default = "default_min_queries")]
    pub min_queries: usize,

    /// Hard cap on planned queries
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,

    /// Searches allowed in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,

    /// Soft length target for the report, in words
    #[serde(default = "default_target_words")]
    pub target_words: usize,

    /// Reference text beyond this many characters is cut before prompting
    #[serde(default = "default_max_reference_chars")]
    pub max_reference_chars: usize,

    /// Model-call timeout; mirrors `llm.timeout_secs` once loaded
    #[serde(skip)]
    pub llm_timeout_secs: u64,
}

fn default_max_gaps() -> usize {
    10
}

fn default_min_queries() -> usize {
    5
}

fn default_max_queries() -> usize {
    8
}

fn default_concurrency() -> usize {
    4
}

fn default_results_per_query() -> usize {
    5
}

fn default_search_timeout_secs() -> u64 {
    30
}

fn default_target_words() -> usize {
    1500
}

fn default_max_reference_chars() -> usize {
    60_000
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_gaps: default_max_gaps(),
            min_queries: default_min_queries(),
            max_queries: default_max_queries(),
            concurrency: default_concurrency(),
            results_per_query: default_results_per_query(),
            search_timeout_secs: default_search_timeout_secs(),
            target_words: default_target_words(),
            max_reference_chars: default_max_reference_chars(),
            llm_timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl ResearchConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.max_queries == 0 {
            return Err(AppError::Configuration(
                "research.max_queries must be at least 1".to_string(),
            ));
        }
        if self.min_queries > self.max_queries {
            return Err(AppError::Configuration(format!(
                "research.min_queries ({}) exceeds research.max_queries ({})",
                self.min_queries, self.max_queries
            )));
        }
        if self.concurrency == 0 || self.results_per_query == 0 {
            return Err(AppError::Configuration(
                "research.concurrency and research.results_per_query must be at least 1"
                    .to_string(),
            ));
        }
        if self.search_timeout_secs == 0 {
            return Err(AppError::Configuration(
                "research.search_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ============= Output Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the report and trace files are written to
    #[serde(default = "default_output_dir")]
    pub directory: String,

    #[serde(default = "default_write_trace")]
    pub write_trace: bool,
}

fn default_output_dir() -> String {
    "./reports".to_string()
}

fn default_write_trace() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            write_trace: default_write_trace(),
        }
    }
}

// ============= Loading =============

impl Config {
    /// Parse configuration from TOML text without touching the environment.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| AppError::Configuration(format!("Invalid configuration: {}", e)))?;
        config.research.llm_timeout_secs = config.llm.timeout_secs;
        config.research.validate()?;
        if config.llm.timeout_secs == 0 {
            return Err(AppError::Configuration(
                "llm.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Load configuration from `path` (if it exists) and resolve the credential
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Fails when the file is unreadable or invalid, or when the OpenAI
    /// provider is selected and its API key variable is unset.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Configuration(format!("Cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&content)?
            }
            _ => Self::from_toml_str("")?,
        };

        config.llm.api_key = env::var(&config.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        if config.llm.provider == ProviderKind::OpenAI && config.llm.api_key.is_none() {
            return Err(AppError::Configuration(format!(
                "Please set your {} environment variable",
                config.llm.api_key_env
            )));
        }

        Ok(config)
    }
}
