use std::time::Duration;

use crate::llm::openai::OpenAICompatibleAdapter;
use crate::llm::provider::LLMAdapter;
use crate::types::{AppResult, LLMRequest, LLMResponse};
use async_trait::async_trait;

pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

pub struct GroqAdapter {
    inner: OpenAICompatibleAdapter,
}

impl GroqAdapter {
    pub fn new(api_key: &str, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            inner: OpenAICompatibleAdapter::new(api_key, GROQ_API_BASE, timeout)?,
        })
    }
}

#[async_trait]
impl LLMAdapter for GroqAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.inner.create_chat_completion(request).await
    }
}
