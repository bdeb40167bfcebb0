//! Generation Client
//!
//! Single-attempt request/response wrapper around an [`LLMAdapter`]. No retry,
//! no caching: the caller decides what a failure means.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, GenerationParams, LLMMessage, LLMRequest};

#[derive(Clone)]
pub struct GenerationClient {
    adapter: Arc<dyn LLMAdapter>,
}

impl GenerationClient {
    pub fn new(adapter: Arc<dyn LLMAdapter>) -> Self {
        Self { adapter }
    }

    /// One round trip. Returns the completion text, which is never empty.
    pub async fn generate(&self, messages: Vec<LLMMessage>, params: &GenerationParams) -> AppResult<String> {
        let request = LLMRequest::new(messages, params);
        let response = self.adapter.create_chat_completion(&request).await.map_err(|e| {
            warn!(model = %params.model, error = %e, "Generation call failed");
            match e {
                AppError::Generation(_) => e,
                other => AppError::Generation(other.to_string()),
            }
        })?;

        if response.content.trim().is_empty() {
            warn!(model = %params.model, "Generation returned an empty completion");
            return Err(AppError::Generation("Completion was empty".to_string()));
        }

        debug!(
            model = %params.model,
            response_len = response.content.len(),
            finish_reason = ?response.finish_reason,
            "Generation completed"
        );
        Ok(response.content)
    }
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient").finish_non_exhaustive()
    }
}
