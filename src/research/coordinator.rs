use super::stage::Stage;
use super::trace::{RunTrace, TraceSender};
use crate::agents::researcher::{self, FactSet, QueryOutcome};
use crate::agents::{comparison, editor, gap, planner, AgentRuntime};
use crate::ingest::{Document, DocumentIngest, DocumentSource, FileIngest};
use crate::llm::LLMClient;
use crate::tools::SearchProvider;
use crate::types::{
    AppError, ComparisonResult, ErrorKind, Fact, Gap, Query, Report, ResearchPlan,
    ResearchRequest, Result, TraceEntry, TraceStatus,
};
use crate::utils::config::ResearchConfig;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Everything a caller supplies to start a run.
#[derive(Debug, Clone)]
pub struct RunInput {
    pub topic: String,
    pub document: Option<DocumentSource>,
    pub cancel: CancellationToken,
    pub progress: Option<TraceSender>,
}

impl RunInput {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            document: None,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Read the reference document from `path` during the ingest stage.
    pub fn with_document_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.document = Some(DocumentSource::File(path.into()));
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: TraceSender) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Artifacts of a run that reached DONE.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub run_id: Uuid,
    pub request: ResearchRequest,
    pub gaps: Vec<Gap>,
    pub plan: ResearchPlan,
    pub facts: Vec<Fact>,
    pub report: Report,
    pub comparison: Option<ComparisonResult>,
    pub trace: RunTrace,
}

impl ResearchOutcome {
    pub fn warnings(&self) -> impl Iterator<Item = &TraceEntry> {
        self.trace.warnings()
    }
}

/// Whatever a failed or cancelled run had produced before it stopped.
#[derive(Debug, Clone, Serialize)]
pub struct PartialArtifacts {
    pub facts: Vec<Fact>,
    pub report: Option<Report>,
    /// Always true; exported artifacts carry it so nobody mistakes them for
    /// a finished run
    pub incomplete: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("Research run {run_id} stopped during {stage}: {error}")]
pub struct RunFailure {
    pub run_id: Uuid,
    /// Stage that was executing when the run stopped
    pub stage: Stage,
    #[source]
    pub error: AppError,
    pub trace: RunTrace,
    pub partial: PartialArtifacts,
}

impl RunFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

/// Drives one research run through its stages.
///
/// # Example
///
/// ```rust,ignore
/// let coordinator = ResearchCoordinator::new(llm, Arc::new(WebSearchProvider::new(5)), config.research);
/// let outcome = coordinator.run(RunInput::new("grid-scale energy storage")).await?;
/// println!("{}", outcome.report.title);
/// ```
pub struct ResearchCoordinator {
    runtime: AgentRuntime,
    search: Arc<dyn SearchProvider>,
    ingest: Arc<dyn DocumentIngest>,
    config: ResearchConfig,
}

impl ResearchCoordinator {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        search: Arc<dyn SearchProvider>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            runtime: AgentRuntime::new(llm, config.llm_timeout()),
            search,
            ingest: Arc::new(FileIngest),
            config,
        }
    }

    /// Replace the default file ingest.
    pub fn with_ingest(mut self, ingest: Arc<dyn DocumentIngest>) -> Self {
        self.ingest = ingest;
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Execute a full run.
    ///
    /// Mandatory stages (ingest, research, editing) end the run on failure;
    /// optional stages (gap analysis, comparison) and planning degrade with a
    /// warning in the trace instead.
    pub async fn run(&self, input: RunInput) -> std::result::Result<ResearchOutcome, RunFailure> {
        let RunInput {
            topic,
            document,
            cancel,
            progress,
        } = input;

        let mut state = RunState::new(progress, cancel);
        info!(run_id = %state.run_id, topic = %topic, "Starting research run");

        match self.execute(&mut state, topic, document).await {
            Ok(artifacts) => match state.enter(Stage::Done, "Run completed") {
                Ok(()) => Ok(ResearchOutcome {
                    run_id: state.run_id,
                    request: artifacts.request,
                    gaps: artifacts.gaps,
                    plan: artifacts.plan,
                    facts: artifacts.facts,
                    report: artifacts.report,
                    comparison: artifacts.comparison,
                    trace: state.trace.detach(),
                }),
                Err(e) => Err(state.fail(e)),
            },
            Err(e) => Err(state.fail(e)),
        }
    }

    async fn execute(
        &self,
        state: &mut RunState,
        topic: String,
        document: Option<DocumentSource>,
    ) -> Result<Artifacts> {
        let topic = topic.trim().to_string();
        if topic.is_empty() {
            return Err(AppError::InvalidInput(
                "research topic must not be empty".to_string(),
            ));
        }

        // INGEST
        let reference_text = match document {
            Some(source) => {
                state.enter(Stage::Ingest, format!("Ingesting {}", source.name()))?;
                let document = state.guard(source.load()).await??;
                let text = state
                    .guard(self.ingest.extract_text(&document))
                    .await??;
                state.progress(format!(
                    "Extracted {} characters from {}",
                    text.chars().count(),
                    document.name
                ));
                Some(text)
            }
            None => None,
        };
        let request = ResearchRequest::new(topic, reference_text);

        // GAP_ANALYSIS
        state.enter(Stage::GapAnalysis, "Analysing reference document for gaps")?;
        let gaps = if request.has_reference() {
            match state
                .guard(gap::analyze(&self.runtime, &request, &self.config))
                .await?
            {
                Ok(analysis) => {
                    for warning in analysis.warnings {
                        state.warn(warning);
                    }
                    state.progress(format!("Identified {} gaps", analysis.gaps.len()));
                    analysis.gaps
                }
                Err(e) => {
                    state.warn(format!("Gap analysis failed, continuing without gaps: {}", e));
                    Vec::new()
                }
            }
        } else {
            state.progress("No reference document; skipping gap analysis");
            Vec::new()
        };

        // PLANNING
        state.enter(Stage::Planning, "Planning search queries")?;
        let plan = match state
            .guard(planner::plan(&self.runtime, request.topic(), &gaps, &self.config))
            .await?
        {
            Ok(output) => {
                for warning in output.warnings {
                    state.warn(warning);
                }
                state.progress(format!("Planned {} queries", output.plan.queries.len()));
                output.plan
            }
            Err(e) => {
                state.warn(format!(
                    "Planning failed, researching the topic directly: {}",
                    e
                ));
                ResearchPlan {
                    queries: vec![Query::new(request.topic())],
                    focus_areas: Vec::new(),
                }
            }
        };

        // RESEARCHING
        state.enter(
            Stage::Researching,
            format!("Searching {} queries", plan.queries.len()),
        )?;
        let outcomes = state
            .guard(researcher::research(
                Arc::clone(&self.search),
                &plan.queries,
                Arc::clone(&state.facts),
                &self.config,
                &state.cancel,
            ))
            .await?;
        for outcome in &outcomes {
            state.record_query(outcome);
        }
        state.check_cancelled()?;

        let facts = state.facts.snapshot();
        if facts.is_empty() {
            return Err(AppError::NoFactsCollected {
                queries: plan.queries.len(),
            });
        }
        state.progress(format!(
            "Collected {} facts from {} queries",
            facts.len(),
            outcomes.iter().filter(|o| o.is_success()).count()
        ));

        // EDITING
        state.enter(
            Stage::Editing,
            format!("Writing report from {} facts", facts.len()),
        )?;
        let output = state
            .guard(editor::write_report(
                &self.runtime,
                request.topic(),
                &plan,
                &facts,
                &self.config,
            ))
            .await??;
        for warning in output.warnings {
            state.warn(warning);
        }
        state.progress(format!(
            "Report '{}' has {} sections and {} words",
            output.report.title,
            output.report.sections.len(),
            output.report.word_count()
        ));
        state.report = Some(output.report.clone());
        let report = output.report;

        // COMPARING
        let comparison = match request.reference_text() {
            Some(reference) => {
                state.enter(Stage::Comparing, "Comparing report with reference document")?;
                match state
                    .guard(comparison::compare(
                        &self.runtime,
                        reference,
                        &report,
                        &self.config,
                    ))
                    .await?
                {
                    Ok(result) => {
                        state.progress(format!("Comparison score {:.0}/100", result.score));
                        Some(result)
                    }
                    Err(e) => {
                        state.warn(format!("Comparison unavailable: {}", e));
                        None
                    }
                }
            }
            None => None,
        };

        Ok(Artifacts {
            request,
            gaps,
            plan,
            facts,
            report,
            comparison,
        })
    }
}

struct Artifacts {
    request: ResearchRequest,
    gaps: Vec<Gap>,
    plan: ResearchPlan,
    facts: Vec<Fact>,
    report: Report,
    comparison: Option<ComparisonResult>,
}

/// Mutable bookkeeping of a single run: current stage, trace and the
/// artifacts a failure would still hand back.
struct RunState {
    run_id: Uuid,
    stage: Stage,
    trace: RunTrace,
    cancel: CancellationToken,
    facts: Arc<FactSet>,
    report: Option<Report>,
}

impl RunState {
    fn new(progress: Option<TraceSender>, cancel: CancellationToken) -> Self {
        let mut trace = RunTrace::new(progress);
        trace.record(Stage::Init, TraceStatus::Entered, "Run created");

        Self {
            run_id: Uuid::new_v4(),
            stage: Stage::Init,
            trace,
            cancel,
            facts: Arc::new(FactSet::new()),
            report: None,
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled(self.stage.to_string()));
        }
        Ok(())
    }

    /// Move to `next`, recording exactly one trace entry.
    fn enter(&mut self, next: Stage, message: impl Into<String>) -> Result<()> {
        if !next.is_terminal() {
            self.check_cancelled()?;
        }
        if !self.stage.can_transition_to(next) {
            return Err(AppError::Internal(format!(
                "illegal stage transition {} -> {}",
                self.stage, next
            )));
        }

        let status = match next {
            Stage::Done => TraceStatus::Completed,
            Stage::Failed => TraceStatus::Failed,
            Stage::Cancelled => TraceStatus::Cancelled,
            _ => TraceStatus::Entered,
        };
        let message = message.into();
        info!(run_id = %self.run_id, from = %self.stage, to = %next, "{}", message);

        self.trace.record(next, status, message);
        self.stage = next;
        Ok(())
    }

    fn progress(&mut self, message: impl Into<String>) {
        self.trace.record(self.stage, TraceStatus::Progress, message);
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(run_id = %self.run_id, stage = %self.stage, "{}", message);
        self.trace.record(self.stage, TraceStatus::Warning, message);
    }

    fn record_query(&mut self, outcome: &QueryOutcome) {
        let dropped = format!(
            "{} duplicates, {} blank snippets dropped",
            outcome.duplicates, outcome.blank
        );

        if outcome.skipped {
            self.warn(format!("Query '{}' skipped: run cancelled", outcome.query));
        } else if let Some(error) = &outcome.error {
            self.warn(format!(
                "Query '{}' failed after {} new facts: {}",
                outcome.query, outcome.inserted, error
            ));
        } else if outcome.inserted == 0 {
            self.warn(format!(
                "Query '{}' produced no new facts ({})",
                outcome.query, dropped
            ));
        } else {
            self.progress(format!(
                "Query '{}': {} new facts ({})",
                outcome.query, outcome.inserted, dropped
            ));
        }
    }

    /// Race `future` against cancellation of the run.
    async fn guard<F: Future>(&self, future: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppError::Cancelled(self.stage.to_string())),
            output = future => Ok(output),
        }
    }

    /// Close the run with `error`, keeping what was produced so far.
    fn fail(mut self, error: AppError) -> RunFailure {
        let stage = self.stage;
        let terminal = match error {
            AppError::Cancelled(_) => Stage::Cancelled,
            _ => Stage::Failed,
        };

        if let Err(e) = self.enter(terminal, error.to_string()) {
            warn!(run_id = %self.run_id, error = %e, "Could not record terminal stage");
        }

        RunFailure {
            run_id: self.run_id,
            stage,
            error,
            partial: PartialArtifacts {
                facts: self.facts.snapshot(),
                report: self.report,
                incomplete: true,
            },
            trace: self.trace.detach(),
        }
    }
}
