use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::dataset::{Dataset, TabularDecoder};
use crate::llm::GenerationClient;
use crate::registry::SessionRegistry;
use crate::render::Block;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionRegistry,
    pub client: GenerationClient,
    pub decoder: Arc<dyn TabularDecoder>,
}

// Core domain models

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: u32,
    pub title: String,
    pub description: String,
}

/// The paper being edited. Every accepted change replaces `text` wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperDocument {
    pub text: String,
}

impl PaperDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn replace(&mut self, text: String) {
        self.text = text;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

/// Reserved id of the transient "processing" message
pub const PROCESSING_MESSAGE_ID: &str = "processing";
pub const WELCOME_MESSAGE_ID: &str = "welcome";

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_id(format!("user-{}", Uuid::new_v4()), content, Sender::User)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_id(format!("assistant-{}", Uuid::new_v4()), content, Sender::Assistant)
    }

    pub fn assistant_error(content: impl Into<String>) -> Self {
        Self::with_id(format!("assistant-error-{}", Uuid::new_v4()), content, Sender::Assistant)
    }

    pub fn with_id(id: impl Into<String>, content: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.id == PROCESSING_MESSAGE_ID
    }
}

/// Append-only visible conversation. The processing indicator is the only
/// message ever removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn begin_processing(&mut self, content: &str) {
        self.messages.retain(|m| !m.is_processing());
        self.messages
            .push(ChatMessage::with_id(PROCESSING_MESSAGE_ID, content, Sender::Assistant));
    }

    pub fn end_processing(&mut self) {
        self.messages.retain(|m| !m.is_processing());
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// API Request/Response types

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    pub row_count: usize,
    pub columns: Vec<String>,
    pub preview_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl DatasetSummary {
    pub fn new(dataset: &Dataset, warning: Option<String>) -> Self {
        Self {
            row_count: dataset.row_count,
            columns: dataset.columns.clone(),
            preview_rows: dataset.preview_rows.len(),
            warning,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ContextRequest {
    pub context: String,
}

#[derive(Debug, Serialize)]
pub struct HypothesesResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub hypotheses: Vec<Hypothesis>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub text: String,
    pub blocks: Vec<Block>,
    pub html: String,
}

#[derive(Debug, Deserialize)]
pub struct EditDocumentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RevisionRequest {
    pub instruction: String,
}

#[derive(Debug, Serialize)]
pub struct RevisionResponse {
    pub outcome: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub sessions: usize,
}
