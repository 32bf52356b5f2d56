//! Research agent
//!
//! Runs every planned query against the search provider, with bounded
//! concurrency, and collects attributed snippets into the run's [`FactSet`].

use crate::tools::SearchProvider;
use crate::types::{AppError, Fact, Query, Result, SearchHit};
use crate::utils::config::ResearchConfig;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Insertion-ordered set of facts keyed on `(content, source)`.
///
/// Shared by all research tasks of a run; the first insert of a key wins.
#[derive(Debug, Default)]
pub struct FactSet {
    inner: Mutex<FactSetInner>,
}

#[derive(Debug, Default)]
struct FactSetInner {
    facts: Vec<Fact>,
    keys: HashSet<(String, String)>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `fact`, returning `false` when an equal fact is already present.
    pub fn insert(&self, fact: Fact) -> bool {
        let mut inner = self.inner.lock();
        if !inner.keys.insert(fact.key()) {
            return false;
        }
        inner.facts.push(fact);
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the facts in insertion order.
    pub fn snapshot(&self) -> Vec<Fact> {
        self.inner.lock().facts.clone()
    }
}

/// What happened to a single query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub query: String,
    pub inserted: usize,
    pub duplicates: usize,
    /// Hits dropped because their snippet was blank
    pub blank: usize,
    pub error: Option<String>,
    /// The run was cancelled before this query was searched
    pub skipped: bool,
}

impl QueryOutcome {
    fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            inserted: 0,
            duplicates: 0,
            blank: 0,
            error: None,
            skipped: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && !self.skipped
    }
}

/// Search every query and add the resulting facts to `facts`.
///
/// Returns one outcome per query, in query order. Per-query failures never
/// abort the other queries.
pub async fn research(
    search: Arc<dyn SearchProvider>,
    queries: &[Query],
    facts: Arc<FactSet>,
    config: &ResearchConfig,
    cancel: &CancellationToken,
) -> Vec<QueryOutcome> {
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut outcomes: Vec<QueryOutcome> = queries
        .iter()
        .map(|q| {
            let mut outcome = QueryOutcome::new(&q.text);
            outcome.error = Some("research task did not finish".to_string());
            outcome
        })
        .collect();

    let mut set = JoinSet::new();
    for (index, query) in queries.iter().enumerate() {
        let search = Arc::clone(&search);
        let facts = Arc::clone(&facts);
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        let text = query.text.clone();
        let limit = config.results_per_query;
        let timeout = config.search_timeout();

        set.spawn(async move {
            // The semaphore is never closed, so acquisition cannot fail
            let _permit = semaphore.acquire_owned().await.ok();

            let mut outcome = QueryOutcome::new(&text);
            if cancel.is_cancelled() {
                outcome.skipped = true;
                return (index, outcome);
            }

            match search_query(search.as_ref(), &text, limit, timeout).await {
                Ok((hits, stream_error)) => {
                    for hit in hits {
                        match fact_from_hit(hit, &text) {
                            Some(fact) => {
                                if facts.insert(fact) {
                                    outcome.inserted += 1;
                                } else {
                                    outcome.duplicates += 1;
                                }
                            }
                            None => outcome.blank += 1,
                        }
                    }
                    outcome.error = stream_error.map(|e| e.to_string());
                }
                Err(e) => outcome.error = Some(e.to_string()),
            }

            (index, outcome)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                debug!(
                    query = %outcome.query,
                    inserted = outcome.inserted,
                    duplicates = outcome.duplicates,
                    "Query finished"
                );
                outcomes[index] = outcome;
            }
            Err(e) => warn!(error = %e, "Research task failed to join"),
        }
    }

    outcomes
}

/// Run one search under `timeout`, keeping at most `limit` hits.
///
/// A stream error after some hits were produced is returned alongside the
/// hits already collected.
async fn search_query(
    search: &dyn SearchProvider,
    query: &str,
    limit: usize,
    timeout: Duration,
) -> Result<(Vec<SearchHit>, Option<AppError>)> {
    let collect = async {
        let mut stream = search.search(query).await?;
        let mut hits = Vec::new();
        while hits.len() < limit {
            match stream.next().await {
                Some(Ok(hit)) => hits.push(hit),
                Some(Err(e)) => return Ok((hits, Some(e))),
                None => break,
            }
        }
        Ok::<_, AppError>((hits, None))
    };

    tokio::time::timeout(timeout, collect)
        .await
        .map_err(|_| AppError::ProviderTimeout {
            operation: format!("search '{}' via {}", query, search.name()),
            seconds: timeout.as_secs(),
        })?
}

fn fact_from_hit(hit: SearchHit, query: &str) -> Option<Fact> {
    let content = hit.snippet.trim();
    if content.is_empty() {
        return None;
    }

    let source = if hit.url.trim().is_empty() {
        hit.title.trim().to_string()
    } else {
        hit.url.trim().to_string()
    };
    let title = Some(hit.title.trim().to_string()).filter(|t| !t.is_empty());

    Some(Fact {
        content: content.to_string(),
        source,
        query_origin: query.to_string(),
        title,
    })
}
