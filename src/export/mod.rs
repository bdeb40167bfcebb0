//! Export Encoder
//!
//! Serialises the current paper as verbatim UTF-8 text or as a paginated PDF.
//! A paginated export that fails for any reason degrades to the text export,
//! so an export request always yields the user's content.

pub mod layout;
pub mod pdf;

use std::str::FromStr;

use serde::Serialize;
use tracing::{info, warn};

use crate::models::PaperDocument;
use crate::render::render;
use crate::types::{AppError, AppResult};
use self::layout::{layout, paginate, PageSpec};

pub const TEXT_FILE_NAME: &str = "research_paper.txt";
pub const PDF_FILE_NAME: &str = "research_paper.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Text,
    Pdf,
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Text),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(AppError::InvalidRequest(format!("Unsupported export format: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub page_count: Option<usize>,
    /// Why a paginated export fell back to text
    pub degraded: Option<String>,
}

pub fn export_text(document: &PaperDocument) -> ExportArtifact {
    ExportArtifact {
        format: ExportFormat::Text,
        file_name: TEXT_FILE_NAME,
        content_type: "text/plain; charset=utf-8",
        bytes: document.text.as_bytes().to_vec(),
        page_count: None,
        degraded: None,
    }
}

pub fn export_paginated(document: &PaperDocument, spec: &PageSpec) -> AppResult<ExportArtifact> {
    let visual = layout(&render(&document.text), spec);
    let pages = paginate(&visual, spec)?;
    let bytes = pdf::encode_pdf(&pages, spec)?;

    Ok(ExportArtifact {
        format: ExportFormat::Pdf,
        file_name: PDF_FILE_NAME,
        content_type: "application/pdf",
        bytes,
        page_count: Some(pages.len()),
        degraded: None,
    })
}

/// Export in the requested format, falling back to text if pagination fails
pub fn export_document(document: &PaperDocument, format: ExportFormat, spec: &PageSpec) -> ExportArtifact {
    let artifact = match format {
        ExportFormat::Text => export_text(document),
        ExportFormat::Pdf => match export_paginated(document, spec) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(error = %e, "Paginated export failed, falling back to text");
                ExportArtifact {
                    degraded: Some(e.to_string()),
                    ..export_text(document)
                }
            }
        },
    };

    info!(
        format = ?artifact.format,
        bytes = artifact.bytes.len(),
        pages = ?artifact.page_count,
        degraded = artifact.degraded.is_some(),
        "Export produced"
    );
    artifact
}
