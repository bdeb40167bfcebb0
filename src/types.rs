// Type definitions, wire-level LLM types and the crate-wide error enum

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Role of a message sent to the generation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LLMMessage {
    pub role: MessageRole,
    pub content: String,
}

impl LLMMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Per-call model parameters
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMRequest {
    pub model: String,
    pub messages: Vec<LLMMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl LLMRequest {
    pub fn new(messages: Vec<LLMMessage>, params: &GenerationParams) -> Self {
        Self {
            model: params.model.clone(),
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Pipeline stage a caller is sent back to when a prerequisite is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Hypotheses,
    Document,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Upload => write!(f, "upload"),
            Stage::Hypotheses => write!(f, "hypotheses"),
            Stage::Document => write!(f, "document"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Decode failure: {0}")]
    Decode(String),

    #[error("Dataset is empty: no records were decoded")]
    EmptyDataset,

    #[error("Missing prerequisite: {missing} (return to the {redirect} stage)")]
    MissingPrerequisite {
        missing: &'static str,
        redirect: Stage,
    },

    #[error("Generation failure: {0}")]
    Generation(String),

    #[error("Parse failure: {0}")]
    Parse(String),

    #[error("{0} is already in progress")]
    Busy(&'static str),

    #[error("Export failure: {0}")]
    Export(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn missing(missing: &'static str, redirect: Stage) -> Self {
        AppError::MissingPrerequisite { missing, redirect }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Decode(_) | AppError::InvalidRequest(_) | AppError::EmptyDataset => {
                StatusCode::BAD_REQUEST
            }
            AppError::MissingPrerequisite { .. } | AppError::Busy(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Generation(_) | AppError::Parse(_) => StatusCode::BAD_GATEWAY,
            AppError::Export(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let redirect = match &self {
            AppError::MissingPrerequisite { redirect, .. } => Some(*redirect),
            _ => None,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "redirect": redirect,
        });
        (self.status(), Json(body)).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
