use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============= Request Types =============

/// The immutable input of a single run, created once reference text (if any)
/// has been extracted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchRequest {
    topic: String,
    reference_text: Option<String>,
}

impl ResearchRequest {
    pub fn new(topic: impl Into<String>, reference_text: Option<String>) -> Self {
        Self {
            topic: topic.into(),
            reference_text,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn reference_text(&self) -> Option<&str> {
        self.reference_text.as_deref()
    }

    pub fn has_reference(&self) -> bool {
        self.reference_text.is_some()
    }
}

// ============= Planning Types =============

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GapCategory {
    /// Something the reference document is missing outright
    Gap,
    /// Something the reference covers but should do better
    Improvement,
    /// Something the reference mentions but should go deeper on
    AreaToExpand,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gap {
    pub description: String,
    pub category: GapCategory,
}

impl Gap {
    pub fn new(description: impl Into<String>, category: GapCategory) -> Self {
        Self {
            description: description.into(),
            category,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Ordered search queries plus the focus areas the editor should emphasise.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResearchPlan {
    pub queries: Vec<Query>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

// ============= Research Types =============

/// A single attributed snippet gathered from a web search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fact {
    pub content: String,
    pub source: String,
    pub query_origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Fact {
    /// Identity of a fact inside a run's fact set.
    pub fn key(&self) -> (String, String) {
        (self.content.clone(), self.source.clone())
    }
}

/// A raw search result as returned by a search provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

// ============= Report Types =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSection {
    pub heading: String,
    pub body: String,
    /// 1-based indexes into the run's fact sequence
    #[serde(default)]
    pub citations: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub title: String,
    pub sections: Vec<ReportSection>,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Report {
    pub fn outline(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.heading.as_str()).collect()
    }

    pub fn word_count(&self) -> usize {
        self.sections
            .iter()
            .map(|s| s.body.split_whitespace().count())
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub summary: String,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    #[serde(default)]
    pub new_insights: Vec<String>,
    #[serde(default)]
    pub quality_assessment: String,
    #[serde(default)]
    pub depth_increase: String,
    /// Always within [`ComparisonResult::MIN_SCORE`, `ComparisonResult::MAX_SCORE`]
    pub score: f64,
}

impl ComparisonResult {
    pub const MIN_SCORE: f64 = 0.0;
    pub const MAX_SCORE: f64 = 100.0;
}

// ============= Trace Types =============

/// Timestamped audit entry; see [`crate::research::trace::RunTrace`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEntry {
    pub stage: crate::research::stage::Stage,
    pub status: TraceStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    /// The run transitioned into the stage
    Entered,
    /// Informational progress inside a stage
    Progress,
    /// Degraded but recoverable outcome
    Warning,
    /// Terminal success
    Completed,
    /// Terminal failure
    Failed,
    /// Terminal cancellation
    Cancelled,
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TraceStatus::Entered => "entered",
            TraceStatus::Progress => "progress",
            TraceStatus::Warning => "warning",
            TraceStatus::Completed => "completed",
            TraceStatus::Failed => "failed",
            TraceStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

// ============= Error Types =============

/// Coarse classification of an [`AppError`], used by callers to decide how
/// to present a failed run.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    IngestFailed,
    PlanningFailed,
    NoFactsCollected,
    ReportGenerationFailed,
    ProviderTimeout,
    Cancelled,
    InvalidInput,
    Configuration,
    Provider,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Ingest failed: {0}")]
    IngestFailed(String),

    #[error("Planning failed: {0}")]
    PlanningFailed(String),

    #[error("No facts collected from {queries} queries")]
    NoFactsCollected { queries: usize },

    #[error("Report generation failed: {0}")]
    ReportGenerationFailed(String),

    #[error("Provider timed out after {seconds}s: {operation}")]
    ProviderTimeout { operation: String, seconds: u64 },

    #[error("Run cancelled during {0}")]
    Cancelled(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Failed to parse model output: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::IngestFailed(_) => ErrorKind::IngestFailed,
            AppError::PlanningFailed(_) => ErrorKind::PlanningFailed,
            AppError::NoFactsCollected { .. } => ErrorKind::NoFactsCollected,
            AppError::ReportGenerationFailed(_) => ErrorKind::ReportGenerationFailed,
            AppError::ProviderTimeout { .. } => ErrorKind::ProviderTimeout,
            AppError::Cancelled(_) => ErrorKind::Cancelled,
            AppError::LLM(_) | AppError::Search(_) | AppError::Parse(_) => ErrorKind::Provider,
            AppError::Configuration(_) => ErrorKind::Configuration,
            AppError::InvalidInput(_) => ErrorKind::InvalidInput,
            AppError::Io(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
