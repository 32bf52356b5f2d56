//! Comparison agent: judges the new report against the reference document.

use super::{clean_item, parse_json, truncate_chars, AgentRole, AgentRuntime};
use crate::export::render_report;
use crate::types::{AppError, ComparisonResult, Report, Result};
use crate::utils::config::ResearchConfig;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ComparisonResponse {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    gaps: Vec<String>,
    #[serde(default)]
    new_insights: Vec<String>,
    #[serde(default)]
    quality_assessment: String,
    #[serde(default)]
    depth_increase: String,
    #[serde(default)]
    score: Value,
}

/// Compare `report` with the reference document.
///
/// # Errors
///
/// Fails on model errors and on output without a numeric score or without
/// both strengths and gaps.
pub async fn compare(
    runtime: &AgentRuntime,
    reference_text: &str,
    report: &Report,
    config: &ResearchConfig,
) -> Result<ComparisonResult> {
    let reference = truncate_chars(reference_text, config.max_reference_chars);
    let prompt = build_prompt(reference, &render_report(report, false));

    let response = runtime
        .complete(AgentRole::Comparator, &prompt, None)
        .await?;
    let result = parse_comparison(&response)?;

    debug!(score = result.score, "Comparison complete");
    Ok(result)
}

fn build_prompt(reference: &str, report: &str) -> String {
    format!(
        r#"ORIGINAL DOCUMENT:
{reference}

NEW REPORT:
{report}

Compare the two documents and answer with this JSON shape:

{{
  "summary": "short summary of the original document",
  "strengths": ["what the new report covers better"],
  "gaps": ["what the new report still misses"],
  "new_insights": ["insights the new report adds"],
  "quality_assessment": "overall quality of the new report relative to the original",
  "depth_increase": "how much deeper the new report goes",
  "score": 0
}}

"score" is a number from 0 to 100 rating the new report's improvement over the original."#
    )
}

pub(crate) fn parse_comparison(response: &str) -> Result<ComparisonResult> {
    let parsed: ComparisonResponse = parse_json(response)?;

    let score = parse_score(&parsed.score).ok_or_else(|| {
        AppError::Parse(format!("comparison score is not numeric: {}", parsed.score))
    })?;

    let strengths = clean_list(parsed.strengths);
    let gaps = clean_list(parsed.gaps);
    if strengths.is_empty() || gaps.is_empty() {
        return Err(AppError::Parse(
            "comparison must list both strengths and gaps".to_string(),
        ));
    }

    Ok(ComparisonResult {
        summary: parsed.summary.trim().to_string(),
        strengths,
        gaps,
        new_insights: clean_list(parsed.new_insights),
        quality_assessment: parsed.quality_assessment.trim().to_string(),
        depth_increase: parsed.depth_increase.trim().to_string(),
        score: score.clamp(ComparisonResult::MIN_SCORE, ComparisonResult::MAX_SCORE),
    })
}

/// Accept `85`, `85.5`, `"85"` and `"85/100"`.
fn parse_score(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.split('/').next()?.trim().parse().ok()?,
        _ => return None,
    };
    score.is_finite().then_some(score)
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .iter()
        .map(|item| clean_item(item))
        .filter(|item| !item.is_empty())
        .collect()
}
