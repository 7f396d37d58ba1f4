//! Web server module for handling GitHub webhooks.
//!
//! This module provides the HTTP surface:
//! - `POST /webhook`: authenticated webhook deliveries
//! - `GET /status`: outcome of the most recent sync
//! - `GET /health`: liveness probe

pub mod event;
pub mod handlers;
pub mod signature;

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

pub use event::{WebhookEnvelope, WebhookEvent, EVENT_HEADER};
pub use handlers::{
    github_webhook, health, status, AppState, HealthResponse, StatusResponse, MAX_BODY_BYTES,
};
pub use signature::{
    sign_github_payload, verify_github_signature, SIGNATURE_HEADER, SIGNATURE_PREFIX,
};

/// Build the application router.
///
/// `/webhook` accepts every method so the handler can answer non-POST
/// requests with its own 405 body.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/webhook", any(github_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
