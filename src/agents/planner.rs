//! Planning agent: turns the topic and known gaps into ordered search queries.

use super::{clean_item, parse_json, strip_list_marker, AgentRole, AgentRuntime};
use crate::types::{AppError, Gap, GapCategory, Query, ResearchPlan, Result};
use crate::utils::config::ResearchConfig;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannerOutput {
    pub plan: ResearchPlan,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlanResponse {
    #[serde(default)]
    queries: Vec<QueryItem>,
    #[serde(default)]
    focus_areas: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QueryItem {
    Text(String),
    Detailed {
        #[serde(alias = "query")]
        text: String,
        #[serde(default)]
        rationale: Option<String>,
    },
}

impl From<QueryItem> for Query {
    fn from(item: QueryItem) -> Self {
        match item {
            QueryItem::Text(text) => Query::new(text),
            QueryItem::Detailed { text, rationale } => {
                let query = Query::new(text);
                match rationale.map(|r| r.trim().to_string()) {
                    Some(r) if !r.is_empty() => query.with_rationale(r),
                    _ => query,
                }
            }
        }
    }
}

/// Produce a research plan for `topic`, steered by `gaps`.
///
/// # Errors
///
/// Returns [`AppError::PlanningFailed`] when the model call fails or the
/// output contains no usable query.
pub async fn plan(
    runtime: &AgentRuntime,
    topic: &str,
    gaps: &[Gap],
    config: &ResearchConfig,
) -> Result<PlannerOutput> {
    let prompt = build_prompt(topic, gaps, config);
    let response = runtime
        .complete(AgentRole::Planner, &prompt, None)
        .await
        .map_err(|e| match e {
            AppError::ProviderTimeout { .. } => e,
            other => AppError::PlanningFailed(other.to_string()),
        })?;

    let mut warnings = Vec::new();
    let raw = match parse_json::<PlanResponse>(&response) {
        Ok(parsed) => ResearchPlan {
            queries: parsed.queries.into_iter().map(Query::from).collect(),
            focus_areas: parsed
                .focus_areas
                .iter()
                .map(|f| clean_item(f))
                .filter(|f| !f.is_empty())
                .collect(),
        },
        Err(e) => {
            warn!(error = %e, "Planner output is not JSON, reading it as a list");
            warnings.push("Planner output was not JSON; read queries from a plain list".to_string());
            ResearchPlan {
                queries: parse_query_lines(&response),
                focus_areas: Vec::new(),
            }
        }
    };

    let (queries, dropped) = normalize_queries(raw.queries, config.max_queries);
    if dropped.duplicates > 0 {
        warnings.push(format!("Dropped {} duplicate queries", dropped.duplicates));
    }
    if dropped.over_limit > 0 {
        warnings.push(format!(
            "Dropped {} queries beyond the limit of {}",
            dropped.over_limit, config.max_queries
        ));
    }

    if queries.is_empty() {
        return Err(AppError::PlanningFailed(
            "model returned no usable queries".to_string(),
        ));
    }

    debug!(queries = queries.len(), "Research plan ready");
    Ok(PlannerOutput {
        plan: ResearchPlan {
            queries,
            focus_areas: raw.focus_areas,
        },
        warnings,
    })
}

fn build_prompt(topic: &str, gaps: &[Gap], config: &ResearchConfig) -> String {
    let mut prompt = format!("Research topic: {}\n", topic);

    if !gaps.is_empty() {
        prompt.push_str("\nKnown weaknesses of the existing document on this topic:\n");
        for gap in gaps {
            let label = match gap.category {
                GapCategory::Gap => "missing",
                GapCategory::Improvement => "improve",
                GapCategory::AreaToExpand => "expand",
            };
            prompt.push_str(&format!("- ({}) {}\n", label, gap.description));
        }
        prompt.push_str("Prioritise queries that close these weaknesses.\n");
    }

    prompt.push_str(&format!(
        r#"
Create between {min} and {max} web search queries that together cover the topic thoroughly, plus the focus areas the final report should emphasise.
Answer with this JSON shape:

{{
  "queries": [{{"text": "search query", "rationale": "why this query matters"}}],
  "focus_areas": ["theme the report should cover"]
}}"#,
        min = config.min_queries.min(config.max_queries),
        max = config.max_queries
    ));

    prompt
}

/// Fallback parser for numbered or bulleted query lists.
fn parse_query_lines(response: &str) -> Vec<Query> {
    response
        .lines()
        .map(strip_list_marker)
        .map(|line| line.trim_matches('"'))
        .filter(|line| !line.is_empty() && !line.ends_with(':'))
        .map(Query::new)
        .collect()
}

#[derive(Debug, Default, PartialEq)]
struct Dropped {
    duplicates: usize,
    over_limit: usize,
}

/// Clean, deduplicate (case-insensitive, first wins) and cap the queries.
fn normalize_queries(queries: Vec<Query>, max: usize) -> (Vec<Query>, Dropped) {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut dropped = Dropped::default();

    for mut query in queries {
        query.text = clean_item(&query.text);
        if query.text.is_empty() {
            continue;
        }
        if !seen.insert(query.text.to_lowercase()) {
            dropped.duplicates += 1;
            continue;
        }
        if kept.len() == max {
            dropped.over_limit += 1;
            continue;
        }
        kept.push(query);
    }

    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn texts(queries: &[Query]) -> Vec<&str> {
        queries.iter().map(|q| q.text.as_str()).collect()
    }

    #[test]
    fn test_normalize_dedups_case_insensitively_first_wins() {
        let (queries, dropped) = normalize_queries(
            vec![
                Query::new("Flow batteries").with_rationale("first"),
                Query::new("solid state batteries"),
                Query::new("FLOW  batteries").with_rationale("second"),
            ],
            8,
        );

        assert_eq!(texts(&queries), vec!["Flow batteries", "solid state batteries"]);
        assert_eq!(queries[0].rationale.as_deref(), Some("first"));
        assert_eq!(dropped.duplicates, 1);
    }

    #[test]
    fn test_normalize_caps_at_max() {
        let input = (1..=12).map(|i| Query::new(format!("query {}", i))).collect();
        let (queries, dropped) = normalize_queries(input, 8);
        assert_eq!(queries.len(), 8);
        assert_eq!(queries[7].text, "query 8");
        assert_eq!(dropped.over_limit, 4);
    }

    #[rstest]
    #[case::objects(r#"{"queries": [{"text": "a"}, {"text": "b", "rationale": "why"}]}"#, vec!["a", "b"])]
    #[case::strings(r#"{"queries": ["a", "b", "c"], "focus_areas": ["cost"]}"#, vec!["a", "b", "c"])]
    #[case::query_alias(r#"{"queries": [{"query": "a"}]}"#, vec!["a"])]
    fn test_parse_json_shapes(#[case] response: &str, #[case] expected: Vec<&str>) {
        let parsed: PlanResponse = parse_json(response).unwrap();
        let queries: Vec<Query> = parsed.queries.into_iter().map(Query::from).collect();
        assert_eq!(texts(&queries), expected);
    }

    #[test]
    fn test_parse_query_lines() {
        let queries = parse_query_lines(
            "Here are the queries:\n1. grid storage costs 2024\n2) \"pumped hydro capacity\"\n\n- sodium ion cells",
        );
        assert_eq!(
            texts(&queries),
            vec!["grid storage costs 2024", "pumped hydro capacity", "sodium ion cells"]
        );
    }

    #[test]
    fn test_prompt_mentions_gaps_and_bounds() {
        let gaps = vec![Gap::new("No cost data", GapCategory::Gap)];
        let prompt = build_prompt("grid storage", &gaps, &ResearchConfig::default());
        assert!(prompt.contains("(missing) No cost data"));
        assert!(prompt.contains("between 5 and 8"));
    }
}
