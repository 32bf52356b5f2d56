//! LLM Client abstractions and provider management
//!
//! This module provides a unified interface for the language model providers
//! the research agents talk to:
//! - **OpenAI**: any endpoint speaking the chat-completions API
//! - **Ollama**: local inference, behind the `ollama` feature

use crate::agents::AgentRole;
use crate::types::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing the pipeline.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;

    /// Run a role-specific completion.
    ///
    /// The role selects the system prompt; `context`, when present, is placed
    /// ahead of the prompt as reference material.
    async fn complete(
        &self,
        role: AgentRole,
        prompt: &str,
        context: Option<&str>,
    ) -> Result<String> {
        let prompt = match context {
            Some(context) if !context.trim().is_empty() => {
                format!("Context:\n{}\n\n{}", context, prompt)
            }
            _ => prompt.to_string(),
        };
        self.generate_with_system(role.system_prompt(), &prompt)
            .await
    }
}

/// Provider enum for runtime selection
///
/// | Provider | Feature | Notes |
/// |----------|---------|-------|
/// | OpenAI | always | Works with any OpenAI-compatible endpoint |
/// | Ollama | `ollama` | Local inference, no credential needed |
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including compatible APIs)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o-mini".to_string(),
    ///     timeout: Duration::from_secs(120),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        timeout: Duration,
    },

    /// Ollama local LLM provider
    ///
    /// Requires the `ollama` feature.
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns an error if the provider was compiled out or its client
    /// cannot be constructed.
    pub async fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                timeout,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                *timeout,
            )?)),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone()).await?,
            )),

            #[cfg(not(feature = "ollama"))]
            Provider::Ollama { model, .. } => Err(crate::types::AppError::Configuration(format!(
                "Ollama provider requested for model '{}' but scrivener was built without the `ollama` feature",
                model
            ))),
        }
    }

    /// Check if this provider is compiled into the binary
    pub fn is_available(&self) -> bool {
        match self {
            Provider::OpenAI { .. } => true,
            Provider::Ollama { .. } => cfg!(feature = "ollama"),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    /// Model identifier the provider will be asked to use
    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Configuration-based client factory
///
/// # Example
///
/// ```rust,ignore
/// use scrivener::llm::{LLMClientFactory, Provider};
///
/// let factory = LLMClientFactory::new(config.llm.provider()?);
/// let client = factory.create_default().await?;
/// ```
pub struct LLMClientFactory {
    default_provider: Provider,
}

impl LLMClientFactory {
    /// Create a new factory with the specified default provider
    pub fn new(default_provider: Provider) -> Self {
        Self { default_provider }
    }

    /// Create a client using the default provider
    pub async fn create_default(&self) -> Result<Box<dyn LLMClient>> {
        self.default_provider.create_client().await
    }

    /// Get a reference to the default provider
    pub fn default_provider(&self) -> &Provider {
        &self.default_provider
    }
}
