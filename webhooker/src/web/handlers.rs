//! Webhook endpoint handlers.
//!
//! The webhook handler works through a fixed sequence, stopping at the first
//! failure:
//! 1. Reject anything but POST
//! 2. Read the raw body
//! 3. Verify the signature over those exact bytes
//! 4. Parse the JSON envelope
//! 5. Dispatch on the event type
//!
//! Once a delivery is authenticated and parsed the sender always gets 200;
//! sync results are only visible in the logs and on `/status`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Bytes},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::sync::{CommandRunner, SyncReport, Synchronizer};
use crate::web::event::{WebhookEnvelope, WebhookEvent, EVENT_HEADER};
use crate::web::signature::{verify_github_signature, SIGNATURE_HEADER};
use crate::Config;

/// GitHub caps webhook payloads at 25 MB.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sync: Synchronizer,
}

impl AppState {
    pub fn new(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        let config = Arc::new(config);
        Self {
            sync: Synchronizer::new(config.clone(), runner),
            config,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Sync Status
// =============================================================================

/// Sync status response.
#[derive(Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub last_sync: Option<SyncReport>,
}

/// Report whether a sync is running and how the last one ended.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        running: state.sync.is_running(),
        last_sync: state.sync.last_report().await,
    })
}

// =============================================================================
// GitHub Webhook
// =============================================================================

/// GitHub webhook endpoint.
pub async fn github_webhook(
    State(state): State<AppState>,
    request: Request,
) -> (StatusCode, &'static str) {
    if *request.method() != Method::POST {
        warn!(method = %request.method(), "webhook_invalid_method");
        return (StatusCode::METHOD_NOT_ALLOWED, "Invalid request method");
    }

    let (parts, body) = request.into_parts();

    let body: Bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "webhook_body_read_failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read request body",
            );
        }
    };

    let signature = header_str(&parts.headers, SIGNATURE_HEADER).unwrap_or_default();
    if !verify_github_signature(state.config.secret_bytes(), &body, signature) {
        warn!(
            body_length = body.len(),
            has_signature = !signature.is_empty(),
            "webhook_signature_invalid"
        );
        return (StatusCode::UNAUTHORIZED, "Invalid webhook signature");
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(env) => env,
        Err(e) => {
            warn!(error = %e, body_length = body.len(), "webhook_json_invalid");
            return (StatusCode::BAD_REQUEST, "Failed to parse JSON");
        }
    };

    let event = WebhookEvent::classify(header_str(&parts.headers, EVENT_HEADER), &envelope);
    info!(event = %event, action = %envelope.action, "webhook_received");

    match event {
        WebhookEvent::Push => {
            // Own task, so a sender hanging up mid-sync cannot cancel it
            let sync = state.sync.clone();
            match tokio::spawn(async move { sync.run().await }).await {
                Ok(report) => info!(succeeded = report.succeeded(), "webhook_push_handled"),
                Err(e) => error!(error = %e, "webhook_sync_task_failed"),
            }
        }
        WebhookEvent::Ping => info!("webhook_ping_received"),
        WebhookEvent::Other(name) => info!(event = %name, "webhook_event_ignored"),
    }

    (StatusCode::OK, "Webhook received")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
