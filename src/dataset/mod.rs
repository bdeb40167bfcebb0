//! Dataset ingestion
//!
//! Decoded tabular records are reduced to a bounded summary (row count,
//! column order, leading preview rows) that the prompt builders embed.

pub mod decoder;

pub use decoder::{DefaultDecoder, FileKind, TabularDecoder};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{AppError, AppResult};

/// One decoded row: column name to scalar value, in encounter order
pub type Record = Map<String, Value>;

/// Preview rows embedded in prompts unless configured otherwise
pub const DEFAULT_PREVIEW_ROWS: usize = 5;
/// Upper bound on preview rows, keeps prompts small
pub const MAX_PREVIEW_ROWS: usize = 10;

/// Immutable summary of an ingested file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub row_count: usize,
    pub columns: Vec<String>,
    pub preview_rows: Vec<Record>,
}

impl Dataset {
    /// Normalize decoded records. `preview_limit` is clamped to `1..=MAX_PREVIEW_ROWS`.
    pub fn from_records(records: Vec<Record>, preview_limit: usize) -> Self {
        let limit = preview_limit.clamp(1, MAX_PREVIEW_ROWS);
        let row_count = records.len();
        let columns = records
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default();
        let preview_rows = records.into_iter().take(limit).collect();

        Self {
            row_count,
            columns,
            preview_rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Stages that need data call this; an empty dataset is reported, not fatal.
    pub fn require_non_empty(&self) -> AppResult<()> {
        if self.is_empty() {
            Err(AppError::EmptyDataset)
        } else {
            Ok(())
        }
    }

    /// Comma separated column list as it appears in prompts
    pub fn column_list(&self) -> String {
        self.columns.join(", ")
    }

    /// Pretty-printed JSON array of the preview rows
    pub fn preview_json(&self) -> String {
        serde_json::to_string_pretty(&self.preview_rows).unwrap_or_else(|_| "[]".to_string())
    }
}
