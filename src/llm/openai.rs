// OpenAI-compatible chat completion adapter
// Works against any endpoint speaking the `/chat/completions` wire format.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest, LLMResponse, TokenUsage};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAICompatibleAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [LLMMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAICompatibleAdapter {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LLMAdapter for OpenAICompatibleAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Generation("No LLM API key configured".to_string()));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(url = %url, model = %request.model, messages = request.messages.len(), "Sending chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&text) {
                return Err(AppError::Generation(format!(
                    "API error ({}): {}",
                    status, error_response.error.message
                )));
            }
            return Err(AppError::Generation(format!("API error ({}): {}", status, text)));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| AppError::Generation(format!("Malformed completion response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Generation("Response contained no choices".to_string()))?;

        let content = choice
            .message
            .content
            .ok_or_else(|| AppError::Generation("Response is missing choices[0].message.content".to_string()))?;

        Ok(LLMResponse {
            content,
            finish_reason: choice.finish_reason,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationParams, LLMMessage};

    fn request() -> LLMRequest {
        LLMRequest::new(
            vec![LLMMessage::system("sys"), LLMMessage::user("hello")],
            &GenerationParams {
                model: "test-model".to_string(),
                temperature: 0.7,
                max_tokens: 100,
            },
        )
    }

    fn adapter(server: &mockito::Server) -> OpenAICompatibleAdapter {
        OpenAICompatibleAdapter::new("test-key", &server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "test-model",
                "max_tokens": 100,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"hi there"},"finish_reason":"stop"}],"usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}"#)
            .create_async()
            .await;

        let response = adapter(&server).create_chat_completion(&request()).await.unwrap();
        assert_eq!(response.content, "hi there");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(5));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_choices_is_generation_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"id":"abc","object":"chat.completion"}"#)
            .create_async()
            .await;

        let err = adapter(&server).create_chat_completion(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }

    #[tokio::test]
    async fn test_missing_content_is_generation_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant"}}]}"#)
            .create_async()
            .await;

        let err = adapter(&server).create_chat_completion(&request()).await.unwrap_err();
        assert!(err.to_string().contains("choices[0].message.content"));
    }

    #[tokio::test]
    async fn test_http_error_carries_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
            .create_async()
            .await;

        let err = adapter(&server).create_chat_completion(&request()).await.unwrap_err();
        match err {
            AppError::Generation(detail) => {
                assert!(detail.contains("429"));
                assert!(detail.contains("Rate limit reached"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_generation_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let err = adapter(&server).create_chat_completion(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }

    #[tokio::test]
    async fn test_empty_api_key_skips_network() {
        let adapter =
            OpenAICompatibleAdapter::new("", "http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = adapter.create_chat_completion(&request()).await.unwrap_err();
        assert!(err.to_string().contains("No LLM API key"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let adapter =
            OpenAICompatibleAdapter::new("k", "https://example.com/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(adapter.base_url(), "https://example.com/v1");
    }
}
