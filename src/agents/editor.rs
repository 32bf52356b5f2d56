//! Editor agent
//!
//! Writes the structured report from the collected facts. Facts are shown to
//! the model as `[F1]`, `[F2]`, ... and every citation in the result is
//! checked against that numbering: a citation pointing at a fact that does
//! not exist is removed, never kept.

use super::{extract_json, parse_json, AgentRole, AgentRuntime};
use crate::types::{AppError, Fact, Report, ReportSection, ResearchPlan, Result};
use crate::utils::config::ResearchConfig;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct EditorOutput {
    pub report: Report,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    sections: Vec<SectionResponse>,
}

#[derive(Debug, Deserialize)]
struct SectionResponse {
    #[serde(default, alias = "title")]
    heading: String,
    #[serde(default, alias = "content")]
    body: String,
    #[serde(default)]
    citations: Vec<Value>,
}

/// Write a report on `topic` from `facts`.
///
/// # Errors
///
/// Returns [`AppError::ReportGenerationFailed`] without calling the model when
/// `facts` is empty, and when the model fails or produces no usable section.
pub async fn write_report(
    runtime: &AgentRuntime,
    topic: &str,
    plan: &ResearchPlan,
    facts: &[Fact],
    config: &ResearchConfig,
) -> Result<EditorOutput> {
    if facts.is_empty() {
        return Err(AppError::ReportGenerationFailed(
            "no facts to write from".to_string(),
        ));
    }

    let prompt = build_prompt(topic, plan, facts, config.target_words);
    let response = runtime
        .complete(AgentRole::Editor, &prompt, None)
        .await
        .map_err(|e| match e {
            AppError::ProviderTimeout { .. } => e,
            other => AppError::ReportGenerationFailed(other.to_string()),
        })?;

    let output = assemble_report(topic, &response, facts)?;
    let mut warnings = output.warnings;

    let words = output.report.word_count();
    if words < config.target_words {
        warnings.push(format!(
            "Report has {} words, below the target of {}",
            words, config.target_words
        ));
    }

    debug!(
        sections = output.report.sections.len(),
        words,
        sources = output.report.sources.len(),
        "Report assembled"
    );

    Ok(EditorOutput {
        report: output.report,
        warnings,
    })
}

fn build_prompt(topic: &str, plan: &ResearchPlan, facts: &[Fact], target_words: usize) -> String {
    let mut prompt = format!("Write a research report on: {}\n", topic);

    if !plan.focus_areas.is_empty() {
        prompt.push_str("\nThe report should emphasise:\n");
        for area in &plan.focus_areas {
            prompt.push_str(&format!("- {}\n", area));
        }
    }

    prompt.push_str("\nFacts gathered from the web:\n");
    for (i, fact) in facts.iter().enumerate() {
        prompt.push_str(&format!("[F{}] {} (source: {})\n", i + 1, fact.content, fact.source));
    }

    prompt.push_str(&format!(
        r#"
Write roughly {target_words} words across an introduction, thematic sections and a conclusion.
Cite supporting facts inline as [F<number>] and list the numbers you cited per section.
Answer with this JSON shape:

{{
  "title": "report title",
  "sections": [{{"heading": "section heading", "body": "markdown text with [F1] citations", "citations": [1]}}]
}}"#
    ));

    prompt
}

/// Parse the model response and validate its citations against `facts`.
pub(crate) fn assemble_report(topic: &str, response: &str, facts: &[Fact]) -> Result<EditorOutput> {
    let mut warnings = Vec::new();

    let parsed = match parse_json::<ReportResponse>(response) {
        Ok(parsed) if !parsed.sections.is_empty() => parsed,
        _ if !has_markdown_headings(response) && looks_like_json(response) => {
            let reason = match parse_json::<ReportResponse>(response) {
                Ok(_) => "report JSON has no sections".to_string(),
                Err(e) => format!("report JSON is malformed: {}", e),
            };
            return Err(AppError::ReportGenerationFailed(reason));
        }
        _ => {
            warn!("Editor output is not structured JSON, reading it as markdown");
            warnings.push("Editor output was not JSON; sections read from markdown".to_string());
            parse_markdown(response)
        }
    };

    let mut sections = Vec::new();
    let mut invalid = Vec::new();
    for section in parsed.sections {
        let heading = section.heading.trim().to_string();
        let rewritten = rewrite_citations(section.body.trim(), facts.len());
        invalid.extend(rewritten.invalid);

        let mut citations = rewritten.valid;
        for label in section.citations.iter().filter_map(citation_label) {
            match resolve_citation(&label, facts.len()) {
                Ok(n) => citations.push(n),
                Err(unknown) => invalid.push(unknown),
            }
        }
        dedup_in_order(&mut citations);

        if rewritten.body.trim().is_empty() {
            warnings.push(format!("Dropped empty section '{}'", heading));
            continue;
        }

        let heading = if heading.is_empty() {
            "Findings".to_string()
        } else {
            heading
        };
        if citations.is_empty() {
            warnings.push(format!("Section '{}' cites no facts", heading));
        }

        sections.push(ReportSection {
            heading,
            body: rewritten.body,
            citations,
        });
    }

    if !invalid.is_empty() {
        dedup_in_order(&mut invalid);
        warnings.push(format!(
            "Removed citations to unknown facts: {}",
            invalid.join(", ")
        ));
    }

    if sections.is_empty() {
        return Err(AppError::ReportGenerationFailed(
            "model produced no usable sections".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let sources = sections
        .iter()
        .flat_map(|s| s.citations.iter())
        .map(|&n| facts[n - 1].source.clone())
        .filter(|source| seen.insert(source.clone()))
        .collect();

    let title = match parsed.title.trim() {
        "" => topic.to_string(),
        title => title.to_string(),
    };

    Ok(EditorOutput {
        report: Report {
            title,
            sections,
            sources,
        },
        warnings,
    })
}

fn has_markdown_headings(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with("# ") || line.starts_with("## ") || line.starts_with("### ")
    })
}

/// A JSON object, possibly fenced or cut off by the token limit.
fn looks_like_json(text: &str) -> bool {
    let body = text
        .trim_start()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_start();
    body.starts_with('{')
        || text.contains("\"sections\"")
        || extract_json(text).is_some_and(|payload| payload.starts_with('{'))
}

/// Fallback for plain markdown output: `#` sets the title, `##`/`###` open
/// sections.
fn parse_markdown(text: &str) -> ReportResponse {
    let mut title = String::new();
    let mut sections: Vec<SectionResponse> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(heading) = trimmed.strip_prefix("# ") {
            if title.is_empty() {
                title = heading.trim().to_string();
                continue;
            }
        }
        if let Some(heading) = trimmed
            .strip_prefix("### ")
            .or_else(|| trimmed.strip_prefix("## "))
        {
            sections.push(SectionResponse {
                heading: heading.trim().to_string(),
                body: String::new(),
                citations: Vec::new(),
            });
            continue;
        }

        if sections.is_empty() {
            if line.trim().is_empty() {
                continue;
            }
            sections.push(SectionResponse {
                heading: String::new(),
                body: String::new(),
                citations: Vec::new(),
            });
        }
        if let Some(section) = sections.last_mut() {
            section.body.push_str(line);
            section.body.push('\n');
        }
    }

    ReportResponse { title, sections }
}

/// The number part of a JSON citation (`3`, `"F3"`, `"[f3]"`).
fn citation_label(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(
            s.trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .trim_start_matches(['F', 'f'])
                .trim()
                .to_string(),
        ),
        _ => None,
    }
}

/// Map a citation number to a fact index in `1..=fact_count`, or to the
/// `F<label>` it is reported as.
fn resolve_citation(label: &str, fact_count: usize) -> std::result::Result<usize, String> {
    label
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=fact_count).contains(n))
        .ok_or_else(|| format!("F{}", label))
}

fn dedup_in_order<T: Clone + Eq + std::hash::Hash>(items: &mut Vec<T>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// Citation markers found in a body.
#[derive(Debug, PartialEq)]
struct RewrittenBody {
    body: String,
    valid: Vec<usize>,
    invalid: Vec<String>,
}

/// Find `[F1]` and `[F1, f2]` markers, keeping only the numbers in
/// `1..=fact_count`.
///
/// Markers left with no valid number are removed from the body.
fn rewrite_citations(body: &str, fact_count: usize) -> RewrittenBody {
    let mut out = String::with_capacity(body.len());
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    let mut rest = body;

    while let Some(start) = find_marker_start(rest) {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];

        match parse_marker(candidate) {
            Some((labels, len)) => {
                let mut kept = Vec::new();
                for label in labels {
                    match resolve_citation(label, fact_count) {
                        Ok(n) => kept.push(n),
                        Err(unknown) => invalid.push(unknown),
                    }
                }
                if !kept.is_empty() {
                    let labels: Vec<String> = kept.iter().map(|n| format!("F{}", n)).collect();
                    out.push_str(&format!("[{}]", labels.join(", ")));
                } else if out.ends_with(' ') {
                    out.pop();
                }
                valid.extend(kept);
                rest = &candidate[len..];
            }
            None => {
                out.push_str(&candidate[..2]);
                rest = &candidate[2..];
            }
        }
    }
    out.push_str(rest);

    RewrittenBody {
        body: out,
        valid,
        invalid,
    }
}

fn find_marker_start(text: &str) -> Option<usize> {
    text.find("[F").into_iter().chain(text.find("[f")).min()
}

/// Parse a marker at the start of `text`, returning its digit strings and
/// length. Numbers too large for `usize` are kept so they can be reported.
fn parse_marker(text: &str) -> Option<(Vec<&str>, usize)> {
    let close = text.find(']')?;
    let inner = &text[1..close];
    let labels = inner
        .split(',')
        .map(|part| {
            let digits = part.trim().strip_prefix(['F', 'f'])?;
            (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
        })
        .collect::<Option<Vec<_>>>()?;
    Some((labels, close + 1))
}

/// Citation numbers referenced by `[Fn]` markers in `body`, in order.
pub fn scan_citations(body: &str) -> Vec<usize> {
    rewrite_citations(body, usize::MAX).valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn facts(n: usize) -> Vec<Fact> {
        (1..=n)
            .map(|i| Fact {
                content: format!("fact {}", i),
                source: format!("https://source{}.example", i),
                query_origin: "q".to_string(),
                title: None,
            })
            .collect()
    }

    #[rstest]
    #[case("Costs fell [F1].", vec![1])]
    #[case("See [F2, F3] and [F1]", vec![2, 3, 1])]
    #[case("Array [Foo] and [F] are not markers", vec![])]
    #[case("No markers", vec![])]
    fn test_scan_citations(#[case] body: &str, #[case] expected: Vec<usize>) {
        assert_eq!(scan_citations(body), expected);
    }

    #[test]
    fn test_rewrite_removes_unknown_citations() {
        let rewritten = rewrite_citations("Costs fell [F1, F9]. Demand rose [F7].", 2);
        assert_eq!(rewritten.body, "Costs fell [F1]. Demand rose.");
        assert_eq!(rewritten.valid, vec![1]);
        assert_eq!(rewritten.invalid, vec!["F9", "F7"]);
    }

    #[rstest]
    #[case("Claim [F1]. Invented [F99999999999999999999999].", "Claim [F1]. Invented.", "F99999999999999999999999")]
    #[case("Claim [f1]. Invented [f9].", "Claim [F1]. Invented.", "F9")]
    #[case("Claim [F1, F007]. Zero [F0].", "Claim [F1]. Zero.", "F007")]
    fn test_rewrite_reports_unresolvable_markers(
        #[case] body: &str,
        #[case] expected: &str,
        #[case] reported: &str,
    ) {
        let rewritten = rewrite_citations(body, 1);
        assert_eq!(rewritten.body, expected);
        assert_eq!(rewritten.valid, vec![1]);
        assert!(rewritten.invalid.iter().any(|label| label == reported));
    }

    #[test]
    fn test_assemble_reports_overflowing_citation() {
        let response = r#"{"sections": [{"heading": "Costs", "body": "Claim [F1]. Invented [F99999999999999999999999].", "citations": ["F99999999999999999999999"]}]}"#;
        let output = assemble_report("storage", response, &facts(1)).unwrap();

        assert!(!output.report.sections[0].body.contains("9999"));
        assert!(output
            .warnings
            .iter()
            .any(|w| w.contains("unknown facts") && w.contains("F99999999999999999999999")));
    }

    #[test]
    fn test_truncated_json_is_a_failure() {
        let response = r#"{"title": "Grid Storage", "sections": [{"heading": "Costs", "body": "Prices fell [F1]. More text"#;
        let err = assemble_report("storage", response, &facts(1)).unwrap_err();
        assert!(matches!(err, AppError::ReportGenerationFailed(_)));
    }

    #[test]
    fn test_json_without_sections_is_a_failure() {
        let response = r#"```json
{"title": "Grid Storage", "sections": []}
```"#;
        let err = assemble_report("storage", response, &facts(1)).unwrap_err();
        assert!(matches!(err, AppError::ReportGenerationFailed(_)));
    }

    #[test]
    fn test_plain_prose_is_read_as_one_section() {
        let output = assemble_report("storage", "Prices fell [F1] last year.", &facts(1)).unwrap();
        assert_eq!(output.report.outline(), vec!["Findings"]);
        assert_eq!(output.report.sections[0].citations, vec![1]);
    }

    #[test]
    fn test_uncited_sections_are_reported() {
        let response = r#"{"sections": [
            {"heading": "Costs", "body": "Prices fell [F1].", "citations": [1]},
            {"heading": "Forecast", "body": "Batteries will cost $12/kWh by 2027.", "citations": []},
            {"heading": "Policy", "body": "Subsidies expand [F8].", "citations": []}
        ]}"#;
        let output = assemble_report("storage", response, &facts(1)).unwrap();

        assert_eq!(output.report.outline(), vec!["Costs", "Forecast", "Policy"]);
        assert!(output.warnings.contains(&"Section 'Forecast' cites no facts".to_string()));
        assert!(output.warnings.contains(&"Section 'Policy' cites no facts".to_string()));
        assert!(!output.warnings.iter().any(|w| w.contains("'Costs'")));
    }

    #[test]
    fn test_assemble_json_report() {
        let response = r#"{"title": "Grid Storage", "sections": [
            {"heading": "Costs", "body": "Prices fell [F2].", "citations": [2, 1]},
            {"heading": "Empty", "body": "   ", "citations": []},
            {"heading": "Outlook", "body": "Growth continues [F2][F5].", "citations": ["F5"]}
        ]}"#;

        let output = assemble_report("storage", response, &facts(3)).unwrap();
        let report = output.report;

        assert_eq!(report.title, "Grid Storage");
        assert_eq!(report.outline(), vec!["Costs", "Outlook"]);
        assert_eq!(report.sections[0].citations, vec![2, 1]);
        assert_eq!(report.sections[1].citations, vec![2]);
        assert_eq!(
            report.sources,
            vec!["https://source2.example", "https://source1.example"]
        );
        assert!(output.warnings.iter().any(|w| w.contains("empty section")));
        assert!(output.warnings.iter().any(|w| w.contains("F5")));
    }

    #[test]
    fn test_assemble_markdown_fallback() {
        let response = "# Tidal Energy\n\nIntro text [F1].\n\n## Resources\nStrong currents [F2].\n";
        let output = assemble_report("tidal", response, &facts(2)).unwrap();

        assert_eq!(output.report.title, "Tidal Energy");
        assert_eq!(output.report.outline(), vec!["Findings", "Resources"]);
        assert_eq!(output.report.sources.len(), 2);
    }

    #[test]
    fn test_assemble_without_sections_fails() {
        let err = assemble_report("tidal", "", &facts(2)).unwrap_err();
        assert!(matches!(err, AppError::ReportGenerationFailed(_)));
    }

    #[test]
    fn test_untitled_report_uses_topic() {
        let response = r#"{"sections": [{"heading": "A", "body": "text [F1]"}]}"#;
        let output = assemble_report("tidal power", response, &facts(1)).unwrap();
        assert_eq!(output.report.title, "tidal power");
    }
}
