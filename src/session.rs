//! Session
//!
//! One user's run through the pipeline. The session owns the dataset, the
//! hypothesis batch, the paper and the conversation, and threads them through
//! each stage call. Each stage has its own in-flight flag: a second request
//! for a stage that is already running is refused, never queued.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::fallback::{
    welcome_message, PROCESSING_MESSAGE, REVISION_APPLIED_MESSAGE, REVISION_FAILED_MESSAGE,
};
use crate::agents::{DocumentAgent, Handoff, HypothesisAgent, RevisionAgent, StageOutcome};
use crate::config::Config;
use crate::dataset::{Dataset, Record};
use crate::export::layout::PageSpec;
use crate::export::{export_document, ExportArtifact, ExportFormat};
use crate::llm::GenerationClient;
use crate::models::{ChatMessage, Conversation, Hypothesis, PaperDocument, Sender, WELCOME_MESSAGE_ID};
use crate::types::{AppError, AppResult, GenerationParams, Stage};

/// Per-session copy of the settings the stages need
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub preview_rows: usize,
    pub hypothesis_params: GenerationParams,
    pub paper_params: GenerationParams,
    pub page: PageSpec,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            preview_rows: config.pipeline.preview_rows,
            hypothesis_params: config.llm.hypothesis_params(),
            paper_params: config.llm.paper_params(),
            page: PageSpec::from(&config.export),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub dataset: Option<Arc<Dataset>>,
    pub extra_context: Option<String>,
    pub hypotheses: Vec<Hypothesis>,
    /// Set when the current batch is the fallback batch
    pub hypotheses_failure: Option<String>,
    pub selected: Option<Hypothesis>,
    pub document: Option<PaperDocument>,
    /// Set when the current document is the error document
    pub document_failure: Option<String>,
    pub conversation: Conversation,
}

impl SessionState {
    fn handoff(&self) -> Handoff {
        Handoff {
            dataset: self.dataset.clone(),
            hypothesis: self.selected.clone(),
        }
    }
}

/// In-flight flag of one stage. Exclusive stages set their own flag before
/// reading the other's, so every access is `SeqCst`.
#[derive(Debug, Default)]
struct StageGuard {
    busy: AtomicBool,
}

impl StageGuard {
    fn try_enter(&self) -> Option<InFlight<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(&self.busy))
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Clears the flag when the stage call finishes, including on early return
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    /// A revision is already in flight, or the paper is being generated
    Busy,
    EmptyInstruction,
}

/// Result of one revision submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionOutcome {
    Applied,
    Rejected { reason: String },
    Ignored(IgnoredReason),
}

impl RevisionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RevisionOutcome::Applied)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RevisionOutcome::Applied => "applied",
            RevisionOutcome::Rejected { .. } => "rejected",
            RevisionOutcome::Ignored(IgnoredReason::Busy) => "busy",
            RevisionOutcome::Ignored(IgnoredReason::EmptyInstruction) => "empty_instruction",
        }
    }
}

#[derive(Debug)]
pub struct IngestReport {
    pub dataset: Arc<Dataset>,
    pub warning: Option<String>,
}

pub struct Session {
    pub id: Uuid,
    client: GenerationClient,
    settings: SessionSettings,
    state: RwLock<SessionState>,
    /// Unix millis of the last lookup through the registry
    last_touched: AtomicI64,
    hypothesis_guard: StageGuard,
    document_guard: StageGuard,
    revision_guard: StageGuard,
}

impl Session {
    pub fn new(client: GenerationClient, settings: SessionSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            settings,
            state: RwLock::new(SessionState::default()),
            last_touched: AtomicI64::new(Utc::now().timestamp_millis()),
            hypothesis_guard: StageGuard::default(),
            document_guard: StageGuard::default(),
            revision_guard: StageGuard::default(),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn touch(&self) {
        self.last_touched.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn idle_for(&self) -> Duration {
        let idle = Utc::now().timestamp_millis() - self.last_touched.load(Ordering::Relaxed);
        Duration::from_millis(idle.max(0) as u64)
    }

    /// True while any stage call is in flight
    pub fn is_busy(&self) -> bool {
        self.hypothesis_guard.is_busy() || self.document_guard.is_busy() || self.revision_guard.is_busy()
    }

    /// Replace the dataset. Everything derived from the previous one is discarded.
    pub async fn ingest(&self, records: Vec<Record>) -> AppResult<IngestReport> {
        let mut state = self.state.write().await;
        if self.is_busy() {
            return Err(AppError::Busy("Generation"));
        }

        let dataset = Arc::new(Dataset::from_records(records, self.settings.preview_rows));
        let warning = dataset.require_non_empty().err().map(|e| e.to_string());
        if let Some(warning) = &warning {
            warn!(session_id = %self.id, warning = %warning, "Ingested an empty dataset");
        }

        *state = SessionState {
            dataset: Some(dataset.clone()),
            extra_context: state.extra_context.take(),
            ..SessionState::default()
        };

        info!(
            session_id = %self.id,
            rows = dataset.row_count,
            columns = dataset.columns.len(),
            "Dataset ingested"
        );
        Ok(IngestReport { dataset, warning })
    }

    /// Blank context clears it
    pub async fn set_context(&self, context: &str) {
        let trimmed = context.trim();
        let mut state = self.state.write().await;
        state.extra_context = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    pub async fn generate_hypotheses(&self) -> AppResult<StageOutcome<Vec<Hypothesis>>> {
        let _in_flight = self
            .hypothesis_guard
            .try_enter()
            .ok_or(AppError::Busy("Hypothesis generation"))?;

        let (dataset, context) = {
            let state = self.state.read().await;
            let dataset = state
                .dataset
                .clone()
                .ok_or_else(|| AppError::missing("dataset", Stage::Upload))?;
            (dataset, state.extra_context.clone())
        };

        info!(session_id = %self.id, "Hypothesis stage started");
        let outcome = HypothesisAgent::generate(
            &self.client,
            &self.settings.hypothesis_params,
            &dataset,
            context.as_deref(),
        )
        .await;

        let mut state = self.state.write().await;
        state.hypotheses = outcome.value().clone();
        state.hypotheses_failure = outcome.reason().map(str::to_string);
        state.selected = None;
        info!(session_id = %self.id, status = outcome.status(), "Hypothesis stage finished");
        Ok(outcome)
    }

    /// Select one hypothesis of the current batch; the rest are discarded
    pub async fn select_hypothesis(&self, id: u32) -> AppResult<Hypothesis> {
        let mut state = self.state.write().await;
        if state.hypotheses.is_empty() {
            return Err(AppError::missing("hypotheses", Stage::Hypotheses));
        }
        let hypothesis = state
            .hypotheses
            .iter()
            .find(|h| h.id == id)
            .cloned()
            .ok_or_else(|| AppError::InvalidRequest(format!("No hypothesis with id {}", id)))?;

        state.hypotheses.clear();
        state.hypotheses_failure = None;
        state.selected = Some(hypothesis.clone());
        info!(session_id = %self.id, hypothesis_id = id, "Hypothesis selected");
        Ok(hypothesis)
    }

    pub async fn generate_document(&self) -> AppResult<StageOutcome<PaperDocument>> {
        let _in_flight = self
            .document_guard
            .try_enter()
            .ok_or(AppError::Busy("Paper generation"))?;
        if self.revision_guard.is_busy() {
            return Err(AppError::Busy("Revision"));
        }

        let (handoff, context) = {
            let state = self.state.read().await;
            (state.handoff(), state.extra_context.clone())
        };

        let outcome = DocumentAgent::generate(
            &self.client,
            &self.settings.paper_params,
            &handoff,
            context.as_deref(),
        )
        .await?;

        let mut state = self.state.write().await;
        state.document = Some(outcome.value().clone());
        state.document_failure = outcome.reason().map(str::to_string);
        state.conversation = Conversation::default();
        if outcome.is_ready() {
            if let Some(hypothesis) = &handoff.hypothesis {
                state.conversation.push(ChatMessage::with_id(
                    WELCOME_MESSAGE_ID,
                    welcome_message(&hypothesis.title),
                    Sender::Assistant,
                ));
            }
        }
        info!(session_id = %self.id, status = outcome.status(), "Document stage finished");
        Ok(outcome)
    }

    /// Submit one revision instruction. Submissions while a revision is in
    /// flight are ignored and leave the document untouched.
    pub async fn revise(&self, instruction: &str) -> AppResult<RevisionOutcome> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Ok(RevisionOutcome::Ignored(IgnoredReason::EmptyInstruction));
        }
        let Some(_in_flight) = self.revision_guard.try_enter() else {
            info!(session_id = %self.id, "Revision ignored, another one is in flight");
            return Ok(RevisionOutcome::Ignored(IgnoredReason::Busy));
        };
        if self.document_guard.is_busy() {
            return Ok(RevisionOutcome::Ignored(IgnoredReason::Busy));
        }

        let current = {
            let mut state = self.state.write().await;
            let current = state
                .document
                .as_ref()
                .map(|doc| doc.text.clone())
                .ok_or_else(|| AppError::missing("document", Stage::Document))?;
            state.conversation.push(ChatMessage::user(instruction));
            state.conversation.begin_processing(PROCESSING_MESSAGE);
            current
        };

        let result = RevisionAgent::revise(
            &self.client,
            &self.settings.paper_params,
            &current,
            instruction,
        )
        .await;

        let mut state = self.state.write().await;
        state.conversation.end_processing();
        let outcome = match result {
            Ok(revised) => {
                if let Some(document) = state.document.as_mut() {
                    document.replace(revised);
                }
                state.document_failure = None;
                state.conversation.push(ChatMessage::assistant(REVISION_APPLIED_MESSAGE));
                RevisionOutcome::Applied
            }
            Err(e) => {
                state.conversation.push(ChatMessage::assistant_error(REVISION_FAILED_MESSAGE));
                RevisionOutcome::Rejected { reason: e.to_string() }
            }
        };
        info!(session_id = %self.id, outcome = outcome.label(), "Revision finished");
        Ok(outcome)
    }

    /// Manual edit: wholesale replace of the paper text
    pub async fn replace_document(&self, text: String) -> AppResult<()> {
        if self.revision_guard.is_busy() {
            return Err(AppError::Busy("Revision"));
        }
        if self.document_guard.is_busy() {
            return Err(AppError::Busy("Paper generation"));
        }

        let mut state = self.state.write().await;
        let document = state
            .document
            .as_mut()
            .ok_or_else(|| AppError::missing("document", Stage::Document))?;
        document.replace(text);
        state.document_failure = None;
        info!(session_id = %self.id, "Document replaced by manual edit");
        Ok(())
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn document(&self) -> AppResult<(PaperDocument, Option<String>)> {
        let state = self.state.read().await;
        let document = state
            .document
            .clone()
            .ok_or_else(|| AppError::missing("document", Stage::Document))?;
        Ok((document, state.document_failure.clone()))
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().await.conversation.messages().to_vec()
    }

    pub async fn export(&self, format: ExportFormat) -> AppResult<ExportArtifact> {
        let (document, _) = self.document().await?;
        Ok(export_document(&document, format, &self.settings.page))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish_non_exhaustive()
    }
}
