//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Handlers only validate and enqueue; all work happens on the queues.

pub mod build;
pub mod error;
pub mod health;
pub mod interaction;

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use shipyard_core::domain::Build;
use shipyard_core::dto::interaction::Interaction;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::registry::ProjectRegistry;
use crate::service::WorkQueue;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ProjectRegistry>,
    pub builds: WorkQueue<Build>,
    pub interactions: WorkQueue<Interaction>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Webhooks
        .route("/build-complete", post(build::build_complete))
        .route("/slack-interactions", post(interaction::slack_interactions))
        .fallback(not_found)
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404: Page not found")
}
