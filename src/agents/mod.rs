//! Agent System
//!
//! The stages that turn a dataset into a revisable paper:
//!
//! - **Hypothesis Agent**: proposes exactly three hypotheses for a dataset
//! - **Document Agent**: writes the full paper for the selected hypothesis
//! - **Revision Agent**: rewrites the whole paper for one user instruction
//!
//! ## Pipeline Overview
//!
//! ```text
//! Dataset
//!    │
//!    ▼
//! ┌─────────────┐
//! │ Hypothesis  │  → 3 candidates (fallback batch on failure)
//! │   Agent     │
//! └─────────────┘
//!    │  user selects one
//!    ▼
//! ┌─────────────┐
//! │  Document   │  → full paper (error document on failure)
//! │   Agent     │
//! └─────────────┘
//!    │
//!    ▼
//! ┌─────────────┐
//! │  Revision   │  → wholesale rewrite, zero or more times
//! │   Agent     │
//! └─────────────┘
//! ```
//!
//! Stages never surface model failures as errors: they resolve to
//! [`StageOutcome::Failed`] carrying fallback content instead.

pub mod document;
pub mod fallback;
pub mod hypothesis;
pub mod prompts;
pub mod revision;

pub use document::DocumentAgent;
pub use hypothesis::HypothesisAgent;
pub use revision::RevisionAgent;

use std::sync::Arc;

use crate::dataset::Dataset;
use crate::models::Hypothesis;
use crate::types::{AppError, AppResult, Stage};

/// Result of one stage run
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Ready(T),
    Failed { fallback: T, reason: String },
}

impl<T> StageOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Ready(value) => value,
            StageOutcome::Failed { fallback, .. } => fallback,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Ready(value) => value,
            StageOutcome::Failed { fallback, .. } => fallback,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, StageOutcome::Ready(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            StageOutcome::Ready(_) => None,
            StageOutcome::Failed { reason, .. } => Some(reason),
        }
    }

    pub fn status(&self) -> &'static str {
        if self.is_ready() {
            "ready"
        } else {
            "failed"
        }
    }
}

/// Inputs carried from ingestion through selection to paper generation
#[derive(Debug, Clone, Default)]
pub struct Handoff {
    pub dataset: Option<Arc<Dataset>>,
    pub hypothesis: Option<Hypothesis>,
}

impl Handoff {
    /// Both inputs of the document stage, or the stage to go back to
    pub fn require(&self) -> AppResult<(&Dataset, &Hypothesis)> {
        let dataset = self
            .dataset
            .as_deref()
            .ok_or_else(|| AppError::missing("dataset", Stage::Upload))?;
        let hypothesis = self
            .hypothesis
            .as_ref()
            .ok_or_else(|| AppError::missing("selected hypothesis", Stage::Hypotheses))?;
        Ok((dataset, hypothesis))
    }
}
