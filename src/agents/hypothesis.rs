//! Hypothesis Agent
//!
//! Asks the model for exactly three hypotheses about a dataset. Any network,
//! parse or validation problem yields the fixed fallback batch instead.

use serde::Deserialize;
use tracing::{info, warn};

use crate::agents::fallback::fallback_hypotheses;
use crate::agents::prompts::build_hypothesis_prompt;
use crate::agents::StageOutcome;
use crate::dataset::Dataset;
use crate::llm::GenerationClient;
use crate::models::Hypothesis;
use crate::types::{AppError, AppResult, GenerationParams};

pub const HYPOTHESIS_COUNT: usize = 3;

#[derive(Debug, Deserialize)]
struct RawHypothesis {
    id: u32,
    title: String,
    description: String,
}

pub struct HypothesisAgent;

impl HypothesisAgent {
    pub async fn generate(
        client: &GenerationClient,
        params: &GenerationParams,
        dataset: &Dataset,
        extra_context: Option<&str>,
    ) -> StageOutcome<Vec<Hypothesis>> {
        if let Err(e) = dataset.require_non_empty() {
            warn!(error = %e, "Generating hypotheses from an empty dataset summary");
        }

        info!(
            columns = dataset.columns.len(),
            rows = dataset.row_count,
            "Starting hypothesis generation"
        );

        let messages = build_hypothesis_prompt(dataset, extra_context);
        let result = match client.generate(messages, params).await {
            Ok(text) => Self::parse_hypotheses(&text),
            Err(e) => Err(e),
        };

        match result {
            Ok(hypotheses) => {
                info!(count = hypotheses.len(), "Hypotheses generated");
                StageOutcome::Ready(hypotheses)
            }
            Err(e) => {
                warn!(error = %e, "Hypothesis generation failed, using fallback batch");
                StageOutcome::Failed {
                    fallback: fallback_hypotheses(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Strictly parse a completion into exactly three hypotheses.
    ///
    /// A surrounding markdown code fence is tolerated; the content inside must
    /// be a JSON array of three objects with non-empty `title` and
    /// `description`. Ids are renumbered 1..=3 by position.
    pub fn parse_hypotheses(completion: &str) -> AppResult<Vec<Hypothesis>> {
        let json_str = strip_code_fence(completion);
        let raw: Vec<RawHypothesis> = serde_json::from_str(json_str)
            .map_err(|e| AppError::Parse(format!("Hypotheses are not a valid JSON array: {}", e)))?;

        if raw.len() != HYPOTHESIS_COUNT {
            return Err(AppError::Parse(format!(
                "Expected {} hypotheses, got {}",
                HYPOTHESIS_COUNT,
                raw.len()
            )));
        }

        raw.into_iter()
            .enumerate()
            .map(|(idx, h)| {
                let title = h.title.trim();
                let description = h.description.trim();
                if title.is_empty() || description.is_empty() {
                    return Err(AppError::Parse(format!(
                        "Hypothesis {} has an empty title or description",
                        h.id
                    )));
                }
                Ok(Hypothesis {
                    id: idx as u32 + 1,
                    title: title.to_string(),
                    description: description.to_string(),
                })
            })
            .collect()
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    // drop the info string (e.g. `json`) on the opening line
    match body.split_once('\n') {
        Some((info, rest)) if !info.trim_start().starts_with('[') => rest.trim(),
        _ => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::fallback::FALLBACK_HYPOTHESES;
    use crate::llm::scripted::ScriptedAdapter;
    use serde_json::json;
    use std::collections::HashSet;

    const VALID: &str = r#"[
        {"id": 1, "title": "Sales rise with ad spend", "description": "More ads, more sales."},
        {"id": 2, "title": "Seasonal peaks", "description": "Q4 dominates."},
        {"id": 3, "title": "Regional gap", "description": "North outsells south."}
    ]"#;

    fn params() -> GenerationParams {
        GenerationParams {
            model: "m".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    fn dataset() -> Dataset {
        let rows = vec![json!({"region": "north", "sales": 3})]
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect();
        Dataset::from_records(rows, 5)
    }

    fn assert_valid_batch(hypotheses: &[Hypothesis]) {
        assert_eq!(hypotheses.len(), 3);
        let ids: HashSet<u32> = hypotheses.iter().map(|h| h.id).collect();
        assert_eq!(ids, HashSet::from([1, 2, 3]));
    }

    #[test]
    fn test_parse_valid_batch() {
        let hypotheses = HypothesisAgent::parse_hypotheses(VALID).unwrap();
        assert_valid_batch(&hypotheses);
        assert_eq!(hypotheses[1].title, "Seasonal peaks");
    }

    #[test]
    fn test_parse_fenced_batch() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert_valid_batch(&HypothesisAgent::parse_hypotheses(&fenced).unwrap());

        let bare_fence = format!("```\n{}\n```", VALID);
        assert_valid_batch(&HypothesisAgent::parse_hypotheses(&bare_fence).unwrap());
    }

    #[test]
    fn test_parse_renumbers_ids() {
        let text = r#"[
            {"id": 7, "title": "a", "description": "x"},
            {"id": 7, "title": "b", "description": "y"},
            {"id": 9, "title": "c", "description": "z"}
        ]"#;
        let hypotheses = HypothesisAgent::parse_hypotheses(text).unwrap();
        assert_eq!(hypotheses.iter().map(|h| h.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        let cases = [
            "Here are some hypotheses: 1. foo",
            r#"[{"id": 1, "title": "a", "description": "x"}]"#,
            r#"[{"id": 1, "title": "a"}, {"id": 2, "title": "b"}, {"id": 3, "title": "c"}]"#,
            r#"[{"id": "one", "title": "a", "description": "x"}, {"id": 2, "title": "b", "description": "y"}, {"id": 3, "title": "c", "description": "z"}]"#,
            r#"[{"id": 1, "title": " ", "description": "x"}, {"id": 2, "title": "b", "description": "y"}, {"id": 3, "title": "c", "description": "z"}]"#,
            r#"{"hypotheses": []}"#,
        ];
        for case in cases {
            assert!(
                matches!(HypothesisAgent::parse_hypotheses(case), Err(AppError::Parse(_))),
                "accepted: {case}"
            );
        }
    }

    #[tokio::test]
    async fn test_generate_ready() {
        let adapter = ScriptedAdapter::with_replies(vec![Ok(VALID.to_string())]);
        let client = GenerationClient::new(adapter.clone());
        let outcome = HypothesisAgent::generate(&client, &params(), &dataset(), None).await;
        assert!(outcome.is_ready());
        assert_valid_batch(outcome.value());
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_yields_fallback() {
        let adapter = ScriptedAdapter::with_replies(vec![Err(AppError::Generation(
            "Malformed completion response: missing field `choices`".to_string(),
        ))]);
        let client = GenerationClient::new(adapter);
        let outcome = HypothesisAgent::generate(&client, &params(), &dataset(), None).await;

        assert!(!outcome.is_ready());
        assert!(outcome.reason().unwrap().contains("choices"));
        let hypotheses = outcome.into_value();
        assert_valid_batch(&hypotheses);
        assert_eq!(hypotheses[0].id, 1);
        assert_eq!(hypotheses[0].title, FALLBACK_HYPOTHESES[0].1);
        assert!(hypotheses[0].title.starts_with("Correlation"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_yields_fallback() {
        let adapter = ScriptedAdapter::with_replies(vec![Ok("I think sales go up.".to_string())]);
        let client = GenerationClient::new(adapter);
        let outcome = HypothesisAgent::generate(&client, &params(), &dataset(), None).await;
        assert!(matches!(outcome, StageOutcome::Failed { .. }));
        assert_eq!(outcome.into_value(), fallback_hypotheses());
    }

    #[tokio::test]
    async fn test_empty_dataset_still_runs() {
        let adapter = ScriptedAdapter::with_replies(vec![Ok(VALID.to_string())]);
        let client = GenerationClient::new(adapter.clone());
        let empty = Dataset::from_records(Vec::new(), 5);
        let outcome = HypothesisAgent::generate(&client, &params(), &empty, None).await;
        assert!(outcome.is_ready());
        assert!(adapter.requests()[0].messages[1].content.contains("Total records: 0"));
    }
}
