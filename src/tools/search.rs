//! Search provider implementation using daedra
//!
//! This module provides web search capabilities via the daedra crate,
//! which uses DuckDuckGo as the search backend.

use crate::tools::{SearchProvider, SearchStream};
use crate::types::{AppError, Result, SearchHit};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::debug;

/// Web search provider powered by daedra
pub struct WebSearchProvider {
    num_results: usize,
}

impl WebSearchProvider {
    pub fn new(num_results: usize) -> Self {
        Self {
            num_results: num_results.max(1),
        }
    }
}

impl Default for WebSearchProvider {
    fn default() -> Self {
        Self::new(10)
    }
}

#[async_trait]
impl SearchProvider for WebSearchProvider {
    fn name(&self) -> &str {
        "web_search"
    }

    async fn search(&self, query: &str) -> Result<SearchStream> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput("Empty search query".to_string()));
        }

        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: self.num_results,
                ..Default::default()
            }),
        };

        let response = daedra::tools::search::perform_search(&search_args)
            .await
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let hits: Vec<SearchHit> = response
            .data
            .iter()
            .map(|r| search_hit(&r.title, &r.url, &r.description))
            .collect();

        debug!(query = %query, hits = hits.len(), "Web search completed");

        Ok(stream::iter(hits.into_iter().map(Ok)).boxed())
    }
}

/// Blank snippets are kept; callers decide what to do with them.
fn search_hit(title: &str, url: &str, description: &str) -> SearchHit {
    SearchHit {
        title: title.trim().to_string(),
        url: url.trim().to_string(),
        snippet: description.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_hit_trims_fields() {
        let hit = search_hit(
            " Grid storage ",
            "https://example.com/storage\n",
            "  Lithium-ion dominates new grid storage.",
        );

        assert_eq!(hit.title, "Grid storage");
        assert_eq!(hit.url, "https://example.com/storage");
        assert_eq!(hit.snippet, "Lithium-ion dominates new grid storage.");
    }

    #[test]
    fn test_search_hit_keeps_blank_snippet() {
        let hit = search_hit("", "https://example.com", "   ");
        assert!(hit.title.is_empty());
        assert!(hit.snippet.is_empty());
    }

    #[tokio::test]
    async fn test_search_empty_query() {
        let provider = WebSearchProvider::default();
        assert!(provider.search("   ").await.is_err());
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(WebSearchProvider::new(0).name(), "web_search");
        assert_eq!(WebSearchProvider::new(0).num_results, 1);
    }
}
