//! OpenAI-compatible chat-completions client.
//!
//! Talks to any endpoint following the OpenAI chat completions API format
//! (OpenAI, Azure OpenAI, OpenRouter, vLLM, LM Studio).

use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    api_base: String,
    model: String,
    timeout: Duration,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String, model: String, timeout: Duration) -> Result<Self> {
        // async-openai appends "/chat/completions" to the base verbatim
        let api_base = api_base.trim_end_matches('/').to_string();
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base.clone());

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::LLM(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: Client::with_config(config).with_http_client(http),
            api_base,
            model,
            timeout,
        })
    }

    async fn chat(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e| AppError::LLM(format!("Failed to build request: {}", e)))?;

        debug!(model = %self.model, api_base = %self.api_base, "Sending chat completion");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| self.map_error(e))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::LLM("No response from OpenAI".to_string()))
    }

    fn map_error(&self, error: OpenAIError) -> AppError {
        match error {
            OpenAIError::Reqwest(e) if e.is_timeout() => AppError::ProviderTimeout {
                operation: format!("chat completion ({})", self.model),
                seconds: self.timeout.as_secs(),
            },
            other => AppError::LLM(format!("OpenAI API error: {}", other)),
        }
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage::from(prompt.to_string()),
        )])
        .await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(
                system.to_string(),
            )),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(
                prompt.to_string(),
            )),
        ])
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
