//! # Scrivener - multi-agent research reports
//!
//! Scrivener turns a research topic, and optionally an existing document on
//! that topic, into a structured, cited markdown report. A fixed pipeline of
//! role-specific agents does the work:
//!
//! ```text
//! [ingest] -> gap analysis -> planning -> research (web search) -> editing -> [comparison]
//! ```
//!
//! Every run produces a [`research::RunTrace`], an ordered audit log of stage
//! transitions, progress and warnings, which can be streamed live and
//! exported with the report.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use scrivener::{Config, LLMClientFactory, ResearchCoordinator, RunInput, WebSearchProvider};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let llm = LLMClientFactory::new(config.llm.provider()?).create_default().await?;
//!     let search = Arc::new(WebSearchProvider::new(config.research.results_per_query));
//!
//!     let coordinator = ResearchCoordinator::new(Arc::from(llm), search, config.research);
//!     match coordinator.run(RunInput::new("grid-scale energy storage")).await {
//!         Ok(outcome) => println!("{}", scrivener::export::render_outcome(&outcome)),
//!         Err(failure) => eprintln!("{} ({:?})", failure, failure.kind()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference |
//!
//! ## Modules
//!
//! - [`agents`] - The gap, planning, research, editor and comparison agents
//! - [`research`] - Run orchestration, stage machine and trace
//! - [`ingest`] - PDF and text document extraction
//! - [`llm`] - LLM client implementations
//! - [`tools`] - Web search provider
//! - [`export`] - Markdown and JSON artifacts
//! - [`types`] - Common types and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Role-specific research agents.
pub mod agents;
/// Command-line interface definitions and terminal output.
pub mod cli;
/// Report and trace export.
pub mod export;
/// Reference document ingest.
pub mod ingest;
/// LLM provider clients and abstractions.
pub mod llm;
/// Research run orchestration.
pub mod research;
/// Web search tools.
pub mod tools;
/// Core types (requests, artifacts, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use ingest::{Document, DocumentIngest, DocumentSource, FileIngest};
pub use llm::{LLMClient, LLMClientFactory, Provider};
pub use research::{
    ResearchCoordinator, ResearchOutcome, RunFailure, RunInput, RunTrace, Stage,
};
pub use tools::{SearchProvider, WebSearchProvider};
pub use types::{AppError, ErrorKind, Result};
pub use utils::config::Config;
