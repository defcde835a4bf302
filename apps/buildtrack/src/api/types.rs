//! # API Request/Response Types
//!
//! JSON structures for the HTTP API, plus [`ApiError`], the single error
//! type every handler returns.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use buildtrack_core::{SnapshotEntry, StageStatus, TrackError, WorkflowSnapshot};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STAGE VIEWS
// =============================================================================

/// One stage as shown to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageView {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub route: String,
    pub accessible: bool,
    pub completed: bool,
    pub status: StageStatus,
    /// Only filled in when a single stage is opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Only filled in when a single stage is opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

impl StageView {
    /// Summary row without prompt or artifact.
    #[must_use]
    pub fn summary(entry: &SnapshotEntry, accessible: bool) -> Self {
        Self {
            index: entry.stage.index,
            id: entry.stage.id.clone(),
            title: entry.stage.title.clone(),
            route: entry.stage.route.clone(),
            accessible,
            completed: entry.completed,
            status: entry.state.status,
            prompt: None,
            artifact: None,
        }
    }

    /// Full view including prompt and artifact.
    #[must_use]
    pub fn detail(entry: &SnapshotEntry, accessible: bool) -> Self {
        Self {
            prompt: Some(entry.stage.prompt.clone()),
            artifact: entry.state.artifact.clone(),
            ..Self::summary(entry, accessible)
        }
    }
}

/// Stage list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesResponse {
    pub stages: Vec<StageView>,
    /// Id of the first stage without an artifact; `None` when all are done.
    pub current: Option<String>,
}

// =============================================================================
// STAGE WRITES
// =============================================================================

/// Artifact upload. An absent artifact records a placeholder marker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactRequest {
    #[serde(default)]
    pub artifact: Option<String>,
}

/// Status change. Only `success` and `error` are accepted; `idle` answers 400.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: StageStatus,
}

/// Where to go after a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextResponse {
    /// Next stage id, or `"proof"`.
    pub next: String,
    pub route: Option<String>,
    pub terminal: bool,
}

// =============================================================================
// PROOF
// =============================================================================

/// Completion grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofResponse {
    pub stages: Vec<StageView>,
    pub completed_count: usize,
    pub total: usize,
    pub percent: u8,
    pub all_completed: bool,
    pub submission_enabled: bool,
}

impl ProofResponse {
    /// Build from a snapshot; `accessible` holds one flag per entry.
    #[must_use]
    pub fn new(snapshot: &WorkflowSnapshot, accessible: &[bool]) -> Self {
        let stages = snapshot
            .entries
            .iter()
            .zip(accessible)
            .map(|(entry, &open)| StageView::summary(entry, open))
            .collect();
        Self {
            stages,
            completed_count: snapshot.completed_count(),
            total: snapshot.entries.len(),
            percent: snapshot.percent(),
            all_completed: snapshot.all_completed,
            submission_enabled: snapshot.submission_enabled(),
        }
    }
}

/// Composed final submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub submission: String,
}

/// Outcome of a reset or import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub success: bool,
    /// Stages reset, or stages carrying state after an import.
    pub stages: usize,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable error code.
    pub code: String,
    /// Id of the stage that must be completed first (403 only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<String>,
}

/// Handler error: a [`TrackError`] mapped to an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub error: TrackError,
    status: Option<StatusCode>,
}

impl From<TrackError> for ApiError {
    fn from(error: TrackError) -> Self {
        Self {
            error,
            status: None,
        }
    }
}

impl ApiError {
    /// Report `error` as a client mistake regardless of its kind.
    #[must_use]
    pub fn bad_request(error: TrackError) -> Self {
        Self {
            error,
            status: Some(StatusCode::BAD_REQUEST),
        }
    }

    /// HTTP status and error code for the wrapped error.
    #[must_use]
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        let (status, code) = self.default_status_and_code();
        (self.status.unwrap_or(status), code)
    }

    fn default_status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.error {
            TrackError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            TrackError::OutOfRange { .. } => (StatusCode::NOT_FOUND, "out_of_range"),
            TrackError::AccessDenied { .. } => (StatusCode::FORBIDDEN, "access_denied"),
            TrackError::LastItem(_) => (StatusCode::CONFLICT, "last_item"),
            TrackError::SubmissionLocked { .. } => (StatusCode::CONFLICT, "submission_locked"),
            TrackError::InvalidLink(_) => (StatusCode::BAD_REQUEST, "invalid_link"),
            TrackError::InvalidStatus(_) => (StatusCode::BAD_REQUEST, "invalid_status"),
            TrackError::ConfirmationRequired(_) => {
                (StatusCode::CONFLICT, "confirmation_required")
            }
            TrackError::ItemOutOfRange { .. } => (StatusCode::BAD_REQUEST, "item_out_of_range"),
            TrackError::InvalidRegistry(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "invalid_registry")
            }
            TrackError::Corrupt(_) => (StatusCode::INTERNAL_SERVER_ERROR, "corrupt"),
            TrackError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "serialization"),
            TrackError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::warn!(error = %self.error, "request failed");
        }
        let blocked_by = match &self.error {
            TrackError::AccessDenied { blocked_by, .. } => Some(blocked_by.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.error.to_string(),
            code: code.to_string(),
            blocked_by,
        };
        (status, Json(body)).into_response()
    }
}
