// Oxidized Paper - turns a tabular dataset into an iteratively revisable research paper

pub mod agents;
pub mod config;
pub mod dataset;
pub mod export;
pub mod llm;
pub mod models;
pub mod registry;
pub mod render;
pub mod routes;
pub mod session;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use session::Session;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
