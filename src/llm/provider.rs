use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::LLMConfig;
use crate::llm::groq::GroqAdapter;
use crate::llm::openai::{OpenAICompatibleAdapter, OPENAI_API_BASE};
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Build the adapter named by `config.provider`
pub fn adapter_from_config(config: &LLMConfig) -> AppResult<Arc<dyn LLMAdapter>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let adapter: Arc<dyn LLMAdapter> = match (config.provider.as_str(), config.base_url.as_deref()) {
        (_, Some(base_url)) => Arc::new(OpenAICompatibleAdapter::new(&config.api_key, base_url, timeout)?),
        ("groq", None) => Arc::new(GroqAdapter::new(&config.api_key, timeout)?),
        ("openai", None) => Arc::new(OpenAICompatibleAdapter::new(&config.api_key, OPENAI_API_BASE, timeout)?),
        ("openai-compatible", None) => {
            return Err(AppError::Config(
                "LLM_BASE_URL must be set for the openai-compatible provider".to_string(),
            ))
        }
        (other, None) => {
            return Err(AppError::Config(format!("Unsupported provider: {}", other)));
        }
    };
    Ok(adapter)
}
