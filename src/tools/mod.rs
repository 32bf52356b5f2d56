//! Search Tools for the Research Agent
//!
//! The research agent never talks to a search engine directly; it goes
//! through the [`SearchProvider`] seam so the pipeline can be driven by the
//! real web or by a scripted provider in tests.
//!
//! # Module Structure
//!
//! - [`search`](crate::tools::search) - Web search integration (DuckDuckGo via daedra)
//!
//! # Usage
//!
//! ```ignore
//! use futures::StreamExt;
//!
//! let provider = WebSearchProvider::new(5);
//! let mut hits = provider.search("flow batteries").await?;
//! while let Some(hit) = hits.next().await {
//!     let hit = hit?;
//!     println!("{}: {}", hit.title, hit.url);
//! }
//! ```

/// Web search provider using DuckDuckGo.
pub mod search;

use crate::types::{Result, SearchHit};
use async_trait::async_trait;
use futures::stream::BoxStream;

pub use search::WebSearchProvider;

/// Lazily produced search results; an item error ends the useful part of the
/// stream but keeps what was already yielded.
pub type SearchStream = BoxStream<'static, Result<SearchHit>>;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short identifier used in logs and trace messages
    fn name(&self) -> &str {
        "search"
    }

    /// Start a search for `query`.
    async fn search(&self, query: &str) -> Result<SearchStream>;
}
