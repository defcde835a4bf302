//! # Buildtrack HTTP API Module
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /stages` - List stages with access and completion
//! - `GET /stages/{id}` - Open a stage (403 while gated)
//! - `POST /stages/{id}/artifact` - Record an artifact (403 while gated)
//! - `PUT /stages/{id}/status` - Set status
//! - `GET /stages/{id}/next` - Next stage or `proof`
//! - `GET /proof` - Completion grid
//! - `POST /proof/submission` - Compose the final submission (409 until complete)
//! - `POST /reset` - Clear all stage progress
//! - `GET /export`, `POST /import` - Binary progress dump
//! - `GET|PUT /resume`, `POST /resume/sample` - Resume profile
//! - `POST /resume/{section}/items`, `DELETE /resume/{section}/items/{index}`
//!
//! `{id}` takes a stage id or a route suffix such as `03-architecture`.
//!
//! ## Configuration (Environment Variables)
//!
//! - `BUILDTRACK_CORS_ORIGINS`: Comma-separated list of allowed origins, or
//!   "*" for all (default: localhost only)

mod handlers;
mod types;

// Re-export handlers and types for integration tests (via `buildtrack::api::*`)
pub use handlers::{
    add_item_handler, export_handler, get_resume_handler, get_stage_handler, health_handler,
    import_handler, list_stages_handler, next_handler, proof_handler, put_resume_handler,
    record_artifact_handler, remove_item_handler, reset_handler, sample_resume_handler,
    set_status_handler, submission_handler,
};
pub use types::{
    ApiError, ArtifactRequest, ErrorResponse, HealthResponse, NextResponse, ProgressResponse,
    ProofResponse, StageView, StagesResponse, StatusRequest, SubmissionResponse,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post, put},
};
use buildtrack_core::{Session, TrackError, primitives::MAX_EXPORT_SIZE};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the session.
#[derive(Clone)]
pub struct AppState {
    /// The session over the progression engine and resume store.
    pub session: Arc<RwLock<Session>>,
}

impl AppState {
    /// Create new app state with a session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build the CORS layer from `BUILDTRACK_CORS_ORIGINS`.
///
/// - "*": any origin
/// - unset: localhost only
/// - otherwise: the comma-separated origins that parse
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("BUILDTRACK_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins (BUILDTRACK_CORS_ORIGINS=*)");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in BUILDTRACK_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers([header::CONTENT_TYPE])
            }
        }
        None => {
            tracing::debug!("CORS: No BUILDTRACK_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5173",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/stages", get(handlers::list_stages_handler))
        .route("/stages/{id}", get(handlers::get_stage_handler))
        .route(
            "/stages/{id}/artifact",
            post(handlers::record_artifact_handler),
        )
        .route("/stages/{id}/status", put(handlers::set_status_handler))
        .route("/stages/{id}/next", get(handlers::next_handler))
        .route("/proof", get(handlers::proof_handler))
        .route("/proof/submission", post(handlers::submission_handler))
        .route("/reset", post(handlers::reset_handler))
        .route("/export", get(handlers::export_handler))
        .route("/import", post(handlers::import_handler))
        .route(
            "/resume",
            get(handlers::get_resume_handler).put(handlers::put_resume_handler),
        )
        .route("/resume/sample", post(handlers::sample_resume_handler))
        .route("/resume/{section}/items", post(handlers::add_item_handler))
        .route(
            "/resume/{section}/items/{index}",
            delete(handlers::remove_item_handler),
        )
        .layer(axum::extract::DefaultBodyLimit::max(MAX_EXPORT_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and serve until Ctrl+C.
pub async fn run_server(addr: &str, session: Session) -> Result<(), TrackError> {
    let state = AppState::new(session);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TrackError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("Buildtrack HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TrackError::Io(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
