//! Gap analysis agent
//!
//! Reads the reference document and lists what it is missing, what it should
//! improve and which areas it should expand. Without a reference document the
//! agent does nothing and never calls the model.

use super::{clean_item, parse_json, truncate_chars, AgentRole, AgentRuntime};
use crate::types::{Gap, GapCategory, ResearchRequest, Result};
use crate::utils::config::ResearchConfig;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Output of the gap analysis.
///
/// Degraded outcomes (unparseable output, truncated lists) are reported in
/// `warnings` instead of failing the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GapAnalysis {
    pub gaps: Vec<Gap>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GapResponse {
    #[serde(default)]
    gaps: Vec<Value>,
    #[serde(default)]
    improvements: Vec<Value>,
    #[serde(default)]
    areas_to_expand: Vec<Value>,
}

/// Analyse the reference text of `request` for gaps relative to its topic.
///
/// # Errors
///
/// Only model failures (transport errors, timeouts) are returned as errors;
/// malformed model output yields an empty analysis with a warning.
pub async fn analyze(
    runtime: &AgentRuntime,
    request: &ResearchRequest,
    config: &ResearchConfig,
) -> Result<GapAnalysis> {
    let Some(reference) = request.reference_text() else {
        debug!("No reference document, skipping gap analysis");
        return Ok(GapAnalysis::default());
    };

    let mut warnings = Vec::new();
    let excerpt = truncate_chars(reference, config.max_reference_chars);
    if excerpt.len() < reference.len() {
        warnings.push(format!(
            "Reference text truncated to {} characters for gap analysis",
            config.max_reference_chars
        ));
    }

    let prompt = build_prompt(request.topic(), config.max_gaps);
    let response = runtime
        .complete(AgentRole::GapAnalyst, &prompt, Some(excerpt))
        .await?;

    let mut gaps = match parse_gaps(&response) {
        Ok(gaps) => gaps,
        Err(e) => {
            warn!(error = %e, "Gap analysis output could not be parsed");
            warnings.push(format!("Gap analysis output unusable, continuing without gaps: {}", e));
            return Ok(GapAnalysis { gaps: Vec::new(), warnings });
        }
    };

    if gaps.len() > config.max_gaps {
        warnings.push(format!(
            "Gap list truncated from {} to {} entries",
            gaps.len(),
            config.max_gaps
        ));
        gaps.truncate(config.max_gaps);
    }

    debug!(gaps = gaps.len(), "Gap analysis complete");
    Ok(GapAnalysis { gaps, warnings })
}

fn build_prompt(topic: &str, max_gaps: usize) -> String {
    format!(
        r#"Research topic: {topic}

The context above is an existing research document on this topic.
Compare it against what a thorough treatment of the topic would cover and answer with this JSON shape:

{{
  "gaps": ["topics or questions the document does not address"],
  "improvements": ["parts that are covered but weak, outdated or unsupported"],
  "areas_to_expand": ["parts that are mentioned but deserve deeper treatment"]
}}

List at most {max_gaps} items in total, most important first."#
    )
}

/// Parse the model response into an ordered gap list.
pub(crate) fn parse_gaps(response: &str) -> Result<Vec<Gap>> {
    let parsed: GapResponse = parse_json(response)?;

    let groups = [
        (parsed.gaps, GapCategory::Gap),
        (parsed.improvements, GapCategory::Improvement),
        (parsed.areas_to_expand, GapCategory::AreaToExpand),
    ];

    Ok(groups
        .into_iter()
        .flat_map(|(items, category)| {
            items
                .into_iter()
                .filter_map(|item| item_text(&item))
                .map(move |text| Gap::new(text, category))
        })
        .collect())
}

/// Accept either a bare string or an object carrying a description.
fn item_text(item: &Value) -> Option<String> {
    let raw = match item {
        Value::String(s) => s.as_str(),
        Value::Object(map) => ["description", "text", "gap"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))?,
        _ => return None,
    };
    let text = clean_item(raw);
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMClient;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct FixedClient {
        reply: String,
        calls: AtomicUsize,
    }

    impl FixedClient {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LLMClient for FixedClient {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }

        async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
            self.generate(prompt).await
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn runtime(client: Arc<FixedClient>) -> AgentRuntime {
        AgentRuntime::new(client, Duration::from_secs(5))
    }

    #[test]
    fn test_parse_gaps_keeps_category_order() {
        let gaps = parse_gaps(
            r#"```json
{"gaps": ["Cost data"], "improvements": [{"description": "Update 2019 figures"}], "areas_to_expand": ["1. Recycling"]}
```"#,
        )
        .unwrap();

        assert_eq!(
            gaps,
            vec![
                Gap::new("Cost data", GapCategory::Gap),
                Gap::new("Update 2019 figures", GapCategory::Improvement),
                Gap::new("Recycling", GapCategory::AreaToExpand),
            ]
        );
    }

    #[test]
    fn test_parse_gaps_skips_blank_items() {
        let gaps = parse_gaps(r#"{"gaps": ["", "  ", 42, "Safety"]}"#).unwrap();
        assert_eq!(gaps, vec![Gap::new("Safety", GapCategory::Gap)]);
    }

    #[tokio::test]
    async fn test_no_reference_makes_no_model_call() {
        let client = FixedClient::new("{}");
        let request = ResearchRequest::new("tidal power", None);

        let analysis = analyze(&runtime(client.clone()), &request, &ResearchConfig::default())
            .await
            .unwrap();

        assert!(analysis.gaps.is_empty());
        assert!(analysis.warnings.is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_output_degrades_to_warning() {
        let client = FixedClient::new("I could not find any gaps, sorry.");
        let request = ResearchRequest::new("tidal power", Some("Tidal power is predictable.".into()));

        let analysis = analyze(&runtime(client.clone()), &request, &ResearchConfig::default())
            .await
            .unwrap();

        assert!(analysis.gaps.is_empty());
        assert_eq!(analysis.warnings.len(), 1);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gap_list_is_capped() {
        let items: Vec<String> = (1..=15).map(|i| format!("\"gap {}\"", i)).collect();
        let client = FixedClient::new(&format!("{{\"gaps\": [{}]}}", items.join(",")));
        let request = ResearchRequest::new("tidal power", Some("Short document.".into()));

        let analysis = analyze(&runtime(client), &request, &ResearchConfig::default())
            .await
            .unwrap();

        assert_eq!(analysis.gaps.len(), 10);
        assert_eq!(analysis.gaps[0].description, "gap 1");
        assert!(analysis.warnings[0].contains("truncated"));
    }
}
