use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::dataset::FileKind;
use crate::models::{AppState, ChatMessage, ContextRequest, CreateSessionResponse, DatasetSummary};
use crate::session::{Session, SessionSettings};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", delete(delete_session))
        .route("/api/sessions/{id}/dataset", post(upload_dataset))
        .route("/api/sessions/{id}/context", put(set_context))
        .route("/api/sessions/{id}/messages", get(list_messages))
        .with_state(state)
}

pub(crate) async fn find_session(state: &AppState, id: Uuid) -> AppResult<Arc<Session>> {
    state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {}", id)))
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<CreateSessionResponse>) {
    let session = Session::new(state.client.clone(), SessionSettings::from(&state.config));
    let session = state.sessions.insert(session).await;
    info!(session_id = %session.id, "Session created");

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
        }),
    )
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    state
        .sessions
        .remove(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {}", id)))?;
    info!(session_id = %id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Multipart upload: a `file` field plus an optional `type` hint
async fn upload_dataset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<DatasetSummary>> {
    let session = find_session(&state, id).await?;

    let mut upload: Option<(Option<String>, Bytes)> = None;
    let mut hint: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidRequest(format!("Failed to read upload: {}", e)))?;
                upload = Some((file_name, content));
            }
            Some("type") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidRequest(format!("Failed to read type hint: {}", e)))?;
                hint = Some(text).filter(|h| !h.trim().is_empty());
            }
            _ => {}
        }
    }

    let (file_name, content) = upload
        .ok_or_else(|| AppError::InvalidRequest("Missing multipart field `file`".to_string()))?;
    let kind = match (hint.as_deref(), file_name.as_deref()) {
        (Some(hint), _) => FileKind::from_hint(hint)?,
        (None, Some(name)) => FileKind::from_filename(name)?,
        (None, None) => {
            return Err(AppError::Decode(
                "Cannot detect the file type without a file name or type hint".to_string(),
            ))
        }
    };

    info!(
        session_id = %id,
        file_name = ?file_name,
        kind = ?kind,
        size = content.len(),
        "Dataset upload received"
    );

    // spreadsheet parsing is CPU bound
    let decoder = state.decoder.clone();
    let records = tokio::task::spawn_blocking(move || decoder.decode(&content, kind))
        .await
        .map_err(|e| AppError::Internal(format!("Decoder task failed: {}", e)))??;
    let report = session.ingest(records).await?;
    Ok(Json(DatasetSummary::new(&report.dataset, report.warning)))
}

async fn set_context(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ContextRequest>,
) -> AppResult<StatusCode> {
    let session = find_session(&state, id).await?;
    session.set_context(&request.context).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let session = find_session(&state, id).await?;
    Ok(Json(session.messages().await))
}
