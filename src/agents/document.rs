//! Document Agent
//!
//! Writes the full paper for the selected hypothesis. A failed call produces
//! a short explanatory document so the preview surface always has content.

use tracing::{error, info};

use crate::agents::fallback::DOCUMENT_ERROR_TEXT;
use crate::agents::prompts::build_document_prompt;
use crate::agents::{Handoff, StageOutcome};
use crate::llm::GenerationClient;
use crate::models::PaperDocument;
use crate::types::{AppResult, GenerationParams};

pub struct DocumentAgent;

impl DocumentAgent {
    /// Fails only with `MissingPrerequisite`, before any model call is made.
    pub async fn generate(
        client: &GenerationClient,
        params: &GenerationParams,
        handoff: &Handoff,
        extra_context: Option<&str>,
    ) -> AppResult<StageOutcome<PaperDocument>> {
        let (dataset, hypothesis) = handoff.require()?;

        info!(
            hypothesis_id = hypothesis.id,
            title = %hypothesis.title,
            "Starting paper generation"
        );

        let messages = build_document_prompt(dataset, hypothesis, extra_context);
        match client.generate(messages, params).await {
            Ok(text) => {
                info!(response_len = text.len(), "Paper generated successfully");
                Ok(StageOutcome::Ready(PaperDocument::new(text)))
            }
            Err(e) => {
                error!(error = %e, "Paper generation failed, using error document");
                Ok(StageOutcome::Failed {
                    fallback: Self::error_document(),
                    reason: e.to_string(),
                })
            }
        }
    }

    pub fn error_document() -> PaperDocument {
        PaperDocument::new(DOCUMENT_ERROR_TEXT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::llm::scripted::ScriptedAdapter;
    use crate::models::Hypothesis;
    use crate::types::{AppError, Stage};
    use std::sync::Arc;

    fn params() -> GenerationParams {
        GenerationParams {
            model: "m".to_string(),
            temperature: 0.7,
            max_tokens: 3000,
        }
    }

    fn hypothesis() -> Hypothesis {
        Hypothesis {
            id: 1,
            title: "Correlation".to_string(),
            description: "Things move together.".to_string(),
        }
    }

    fn full_handoff() -> Handoff {
        let rows = vec![serde_json::json!({"a": 1})]
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect();
        Handoff {
            dataset: Some(Arc::new(Dataset::from_records(rows, 5))),
            hypothesis: Some(hypothesis()),
        }
    }

    #[tokio::test]
    async fn test_missing_dataset_makes_no_call() {
        let adapter = ScriptedAdapter::with_replies(vec![Ok("# Paper".to_string())]);
        let client = GenerationClient::new(adapter.clone());
        let handoff = Handoff {
            dataset: None,
            hypothesis: Some(hypothesis()),
        };

        let err = DocumentAgent::generate(&client, &params(), &handoff, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::MissingPrerequisite {
                redirect: Stage::Upload,
                ..
            }
        ));
        assert_eq!(adapter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ready_document() {
        let adapter = ScriptedAdapter::with_replies(vec![Ok("# A Paper\n\nBody".to_string())]);
        let client = GenerationClient::new(adapter.clone());
        let outcome = DocumentAgent::generate(&client, &params(), &full_handoff(), Some("ctx"))
            .await
            .unwrap();
        assert_eq!(outcome, StageOutcome::Ready(PaperDocument::new("# A Paper\n\nBody")));
        assert!(adapter.requests()[0].messages[1].content.contains("Things move together."));
    }

    #[tokio::test]
    async fn test_failure_yields_error_document() {
        let adapter = ScriptedAdapter::with_replies(vec![Err(AppError::Generation("503".to_string()))]);
        let client = GenerationClient::new(adapter);
        let outcome = DocumentAgent::generate(&client, &params(), &full_handoff(), None)
            .await
            .unwrap();
        assert!(!outcome.is_ready());
        assert_eq!(outcome.value().text, DOCUMENT_ERROR_TEXT);
        assert!(outcome.value().text.starts_with("# Error Generating Research Paper"));
    }
}
