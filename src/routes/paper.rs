use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use super::sessions::find_session;
use crate::export::ExportFormat;
use crate::models::{
    AppState, DocumentResponse, EditDocumentRequest, ExportQuery, HypothesesResponse, Hypothesis,
    PaperDocument, RevisionRequest, RevisionResponse,
};
use crate::render::{render, render_html};
use crate::session::RevisionOutcome;
use crate::types::AppResult;

const DEGRADED_HEADER: HeaderName = HeaderName::from_static("x-export-degraded");

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions/{id}/hypotheses", post(generate_hypotheses))
        .route(
            "/api/sessions/{id}/hypotheses/{hypothesis_id}/select",
            post(select_hypothesis),
        )
        .route(
            "/api/sessions/{id}/document",
            post(generate_document).get(get_document).put(edit_document),
        )
        .route("/api/sessions/{id}/revisions", post(submit_revision))
        .route("/api/sessions/{id}/export", get(export_document))
        .with_state(state)
}

fn document_response(document: PaperDocument, status: &'static str, reason: Option<String>) -> DocumentResponse {
    let blocks = render(&document.text);
    let html = render_html(&blocks);
    DocumentResponse {
        status,
        reason,
        text: document.text,
        blocks,
        html,
    }
}

async fn generate_hypotheses(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<HypothesesResponse>> {
    let session = find_session(&state, id).await?;
    let outcome = session.generate_hypotheses().await?;

    Ok(Json(HypothesesResponse {
        status: outcome.status(),
        reason: outcome.reason().map(str::to_string),
        hypotheses: outcome.into_value(),
    }))
}

async fn select_hypothesis(
    State(state): State<AppState>,
    Path((id, hypothesis_id)): Path<(Uuid, u32)>,
) -> AppResult<Json<Hypothesis>> {
    let session = find_session(&state, id).await?;
    Ok(Json(session.select_hypothesis(hypothesis_id).await?))
}

async fn generate_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentResponse>> {
    let session = find_session(&state, id).await?;
    let outcome = session.generate_document().await?;
    let status = outcome.status();
    let reason = outcome.reason().map(str::to_string);
    Ok(Json(document_response(outcome.into_value(), status, reason)))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DocumentResponse>> {
    let session = find_session(&state, id).await?;
    let (document, failure) = session.document().await?;
    let status = if failure.is_some() { "failed" } else { "ready" };
    Ok(Json(document_response(document, status, failure)))
}

async fn edit_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EditDocumentRequest>,
) -> AppResult<Json<DocumentResponse>> {
    let session = find_session(&state, id).await?;
    session.replace_document(request.text).await?;
    let (document, _) = session.document().await?;
    Ok(Json(document_response(document, "ready", None)))
}

async fn submit_revision(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RevisionRequest>,
) -> AppResult<Json<RevisionResponse>> {
    let session = find_session(&state, id).await?;
    let outcome = session.revise(&request.instruction).await?;

    let reason = match &outcome {
        RevisionOutcome::Rejected { reason } => Some(reason.clone()),
        _ => None,
    };
    Ok(Json(RevisionResponse {
        outcome: outcome.label(),
        success: outcome.is_success(),
        reason,
        messages: session.messages().await,
    }))
}

async fn export_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Response> {
    let session = find_session(&state, id).await?;
    let format: ExportFormat = query.format.as_deref().unwrap_or("pdf").parse()?;
    let artifact = session.export(format).await?;

    info!(
        session_id = %id,
        requested = ?format,
        produced = ?artifact.format,
        "Export served"
    );

    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);
    let mut response = (
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response();

    if let Some(reason) = artifact.degraded {
        if let Ok(value) = HeaderValue::from_str(&reason) {
            response.headers_mut().insert(DEGRADED_HEADER, value);
        }
    }
    Ok(response)
}
