//! Revision Agent
//!
//! Sends the complete current paper together with one instruction and returns
//! the model's complete rewritten paper. No retry on failure.

use tracing::{info, warn};

use crate::agents::prompts::build_revision_prompt;
use crate::llm::GenerationClient;
use crate::types::{AppError, AppResult, GenerationParams};

pub struct RevisionAgent;

impl RevisionAgent {
    pub async fn revise(
        client: &GenerationClient,
        params: &GenerationParams,
        current_document: &str,
        instruction: &str,
    ) -> AppResult<String> {
        if instruction.trim().is_empty() {
            return Err(AppError::InvalidRequest("Revision instruction is empty".to_string()));
        }

        info!(
            document_len = current_document.len(),
            instruction_len = instruction.len(),
            "Requesting paper revision"
        );

        let messages = build_revision_prompt(current_document, instruction);
        let revised = client.generate(messages, params).await.map_err(|e| {
            warn!(error = %e, "Revision request failed");
            e
        })?;

        info!(response_len = revised.len(), "Revision received");
        Ok(revised)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedAdapter;

    fn params() -> GenerationParams {
        GenerationParams {
            model: "m".to_string(),
            temperature: 0.7,
            max_tokens: 3000,
        }
    }

    #[tokio::test]
    async fn test_returns_full_rewrite() {
        let adapter = ScriptedAdapter::with_replies(vec![Ok("# Rewritten".to_string())]);
        let client = GenerationClient::new(adapter.clone());
        let revised = RevisionAgent::revise(&client, &params(), "# Original\n\nText", "retitle")
            .await
            .unwrap();
        assert_eq!(revised, "# Rewritten");

        let request = &adapter.requests()[0];
        assert!(request.messages[1].content.contains("# Original\n\nText"));
        assert!(request.messages[1].content.contains("retitle"));
    }

    #[tokio::test]
    async fn test_blank_instruction_makes_no_call() {
        let adapter = ScriptedAdapter::with_replies(vec![Ok("# Rewritten".to_string())]);
        let client = GenerationClient::new(adapter.clone());
        let err = RevisionAgent::revise(&client, &params(), "# Original", "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert_eq!(adapter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let adapter = ScriptedAdapter::with_replies(vec![Err(AppError::Generation("down".to_string()))]);
        let client = GenerationClient::new(adapter);
        let err = RevisionAgent::revise(&client, &params(), "# Original", "shorten")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }
}
