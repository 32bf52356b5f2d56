//! Artifact export
//!
//! Renders reports and comparisons as markdown and writes run artifacts to
//! disk. Artifacts of a run that did not reach DONE always carry an
//! incomplete marker.

use crate::research::{ResearchOutcome, RunFailure, RunTrace};
use crate::types::{AppError, ComparisonResult, Fact, Report, Result};
use chrono::Utc;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

const INCOMPLETE_NOTICE: &str =
    "> **Incomplete report:** this run did not finish; content may be partial.";

/// Files written for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    pub report: Option<PathBuf>,
    pub trace: Option<PathBuf>,
}

/// Render `report` as a markdown document with a plain list of sources.
pub fn render_report(report: &Report, incomplete: bool) -> String {
    let mut out = render_body(report, incomplete);
    if !report.sources.is_empty() {
        out.push_str("## Sources\n\n");
        for source in &report.sources {
            let _ = writeln!(out, "- {}", source);
        }
        out.push('\n');
    }
    out
}

/// Render `report` with a reference list resolving every `[Fn]` citation
/// against `facts`.
pub fn render_cited_report(report: &Report, facts: &[Fact], incomplete: bool) -> String {
    let mut out = render_body(report, incomplete);
    out.push_str(&render_references(report, facts));
    out
}

/// `## References` entries keyed by fact number, for the facts `report` cites.
pub fn render_references(report: &Report, facts: &[Fact]) -> String {
    let cited: BTreeSet<usize> = report
        .sections
        .iter()
        .flat_map(|s| s.citations.iter().copied())
        .filter(|n| (1..=facts.len()).contains(n))
        .collect();
    if cited.is_empty() {
        return String::new();
    }

    let mut out = String::from("## References\n\n");
    for n in cited {
        let fact = &facts[n - 1];
        match &fact.title {
            Some(title) if title != &fact.source => {
                let _ = writeln!(out, "- [F{}] {}: {} ({})", n, title, fact.source, fact.content);
            }
            _ => {
                let _ = writeln!(out, "- [F{}] {} ({})", n, fact.source, fact.content);
            }
        }
    }
    out.push('\n');
    out
}

fn render_body(report: &Report, incomplete: bool) -> String {
    let mut out = format!("# {}\n\n", report.title);
    if incomplete {
        out.push_str(INCOMPLETE_NOTICE);
        out.push_str("\n\n");
    }
    for section in &report.sections {
        let _ = write!(out, "## {}\n\n{}\n\n", section.heading, section.body.trim());
    }
    out
}

/// Render the comparison with the reference document as a markdown section.
pub fn render_comparison(comparison: &ComparisonResult) -> String {
    let mut out = String::from("## Comparison with Reference Document\n\n");
    let _ = write!(out, "**Score:** {:.0}/100\n\n", comparison.score);

    let paragraphs = [
        ("Original Document Summary", comparison.summary.as_str()),
        ("Quality Assessment", comparison.quality_assessment.as_str()),
        ("Depth Increase", comparison.depth_increase.as_str()),
    ];
    let lists = [
        ("Strengths of the New Report", &comparison.strengths),
        ("Remaining Gaps", &comparison.gaps),
        ("New Insights", &comparison.new_insights),
    ];

    if !paragraphs[0].1.is_empty() {
        let _ = write!(out, "### {}\n\n{}\n\n", paragraphs[0].0, paragraphs[0].1);
    }
    for (heading, items) in lists {
        if items.is_empty() {
            continue;
        }
        let _ = write!(out, "### {}\n\n", heading);
        for item in items {
            let _ = writeln!(out, "- {}", item);
        }
        out.push('\n');
    }
    for (heading, text) in &paragraphs[1..] {
        if !text.is_empty() {
            let _ = write!(out, "### {}\n\n{}\n\n", heading, text);
        }
    }

    out
}

/// The full markdown document of a finished run.
pub fn render_outcome(outcome: &ResearchOutcome) -> String {
    let mut out = render_cited_report(&outcome.report, &outcome.facts, false);
    if let Some(comparison) = &outcome.comparison {
        out.push_str(&render_comparison(comparison));
    }
    out
}

/// Markdown for whatever a failed run produced, if anything.
pub fn render_partial(failure: &RunFailure) -> Option<String> {
    if let Some(report) = &failure.partial.report {
        return Some(render_cited_report(report, &failure.partial.facts, true));
    }
    if failure.partial.facts.is_empty() {
        return None;
    }

    let mut out = format!("# Collected facts (run {})\n\n", failure.run_id);
    out.push_str(INCOMPLETE_NOTICE);
    out.push_str("\n\n");
    let _ = write!(out, "Stopped during {}: {}\n\n", failure.stage, failure.error);
    out.push_str(&render_facts(&failure.partial.facts));
    Some(out)
}

fn render_facts(facts: &[Fact]) -> String {
    let mut out = String::new();
    for (i, fact) in facts.iter().enumerate() {
        let _ = writeln!(out, "{}. {} ({})", i + 1, fact.content, fact.source);
    }
    out
}

/// Write the report (and trace) of a finished run into `dir`.
pub async fn write_outcome(
    dir: &Path,
    outcome: &ResearchOutcome,
    write_trace: bool,
) -> Result<ExportPaths> {
    let stamp = timestamp();
    let report = write_file(
        dir,
        &format!("research_report_{}.md", stamp),
        &render_outcome(outcome),
    )
    .await?;
    let trace = if write_trace {
        Some(export_trace(dir, &outcome.trace, &stamp).await?)
    } else {
        None
    };

    Ok(ExportPaths {
        report: Some(report),
        trace,
    })
}

/// Write the partial artifacts (and trace) of a failed run into `dir`.
pub async fn write_failure(
    dir: &Path,
    failure: &RunFailure,
    write_trace: bool,
) -> Result<ExportPaths> {
    let stamp = timestamp();
    let report = match render_partial(failure) {
        Some(markdown) => Some(
            write_file(
                dir,
                &format!("research_report_{}_incomplete.md", stamp),
                &markdown,
            )
            .await?,
        ),
        None => None,
    };
    let trace = if write_trace {
        Some(export_trace(dir, &failure.trace, &stamp).await?)
    } else {
        None
    };

    Ok(ExportPaths { report, trace })
}

async fn export_trace(dir: &Path, trace: &RunTrace, stamp: &str) -> Result<PathBuf> {
    let json = trace
        .to_json()
        .map_err(|e| AppError::Internal(format!("Cannot serialize trace: {}", e)))?;
    write_file(dir, &format!("research_trace_{}.json", stamp), &json).await
}

async fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, content).await?;
    info!(path = %path.display(), bytes = content.len(), "Wrote artifact");
    Ok(path)
}

fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}
