//! API Routes
//!
//! HTTP surface over the session pipeline:
//! - `/api/health` - Health check
//! - `/api/sessions` - Session creation, dataset upload, context, conversation
//! - `/api/sessions/{id}/hypotheses|document|revisions|export` - Pipeline stages

pub mod health;
pub mod paper;
pub mod sessions;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");
    let cors = cors_layer(&state.config.server);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .merge(sessions::router(state.clone()))
        .merge(paper::router(state.clone()))
        .merge(health::router(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
