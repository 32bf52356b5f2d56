//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for interacting with the language
//! model providers behind the research agents.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement, including the
//!   role-aware [`LLMClient::complete`] capability every agent uses
//! - [`Provider`] - Runtime provider selection
//! - [`LLMClientFactory`] - Creates clients for the configured provider
//!
//! # Supported Providers
//!
//! - `openai` - Any OpenAI-compatible chat-completions endpoint (always built)
//! - `ollama` - Local Ollama server (enable the `ollama` feature)
//!
//! # Example
//!
//! ```ignore
//! use scrivener::agents::AgentRole;
//! use scrivener::llm::{LLMClientFactory, Provider};
//!
//! let factory = LLMClientFactory::new(config.llm.provider()?);
//! let client = factory.create_default().await?;
//!
//! let plan = client.complete(AgentRole::Planner, "Plan research on tidal power", None).await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

pub mod openai;

pub use client::{LLMClient, LLMClientFactory, Provider};
