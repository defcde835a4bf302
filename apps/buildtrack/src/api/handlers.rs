//! # API Endpoint Handlers
//!
//! Reads take the session read lock; writes take the write lock for the
//! whole check-then-write, so a gate check and the write it guards see the
//! same store state.

use super::{
    AppState,
    types::{
        ApiError, ArtifactRequest, HealthResponse, NextResponse, ProgressResponse,
        ProofResponse, StageView, StagesResponse, StatusRequest, SubmissionResponse,
    },
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use buildtrack_core::{
    Next, ProgressionEngine, ProofLinks, ResumeProfile, SectionKind, Session, SnapshotEntry,
    Store, Submission, TrackError,
    codec::placeholder_artifact,
    export::{export_progress, import_progress},
};

type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// HELPERS
// =============================================================================

fn entry_at<S: Store>(
    engine: &ProgressionEngine<S>,
    index: usize,
) -> Result<SnapshotEntry, TrackError> {
    let stage = engine.registry().stage_at(index)?.clone();
    let state = engine.state_of(index)?;
    Ok(SnapshotEntry {
        stage,
        completed: state.completed(),
        state,
    })
}

fn accessibility<S: Store>(engine: &ProgressionEngine<S>) -> Result<Vec<bool>, TrackError> {
    (0..engine.registry().len())
        .map(|i| engine.can_access(i))
        .collect()
}

fn detail(session: &Session, index: usize) -> Result<StageView, TrackError> {
    let engine = session.engine();
    let entry = entry_at(engine, index)?;
    Ok(StageView::detail(&entry, engine.can_access(index)?))
}

fn parse_section(raw: &str) -> Result<SectionKind, ApiError> {
    raw.parse::<SectionKind>().map_err(ApiError::from)
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STAGE HANDLERS
// =============================================================================

/// List every stage.
pub async fn list_stages_handler(State(state): State<AppState>) -> ApiResult<StagesResponse> {
    let session = state.session.read().await;
    let engine = session.engine();
    let snapshot = engine.snapshot()?;
    let accessible = accessibility(engine)?;

    let current = match engine.current_stage()? {
        Next::Stage(i) => Some(engine.registry().stage_at(i)?.id.clone()),
        Next::Terminal => None,
    };
    let stages = snapshot
        .entries
        .iter()
        .zip(accessible)
        .map(|(entry, open)| StageView::summary(entry, open))
        .collect();

    Ok(Json(StagesResponse { stages, current }))
}

/// Open a stage. Gated stages answer 403 naming the prerequisite.
pub async fn get_stage_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StageView> {
    let session = state.session.read().await;
    let index = session.engine().registry().resolve(&id)?;
    session.engine().ensure_accessible(index)?;
    Ok(Json(detail(&session, index)?))
}

/// Record an artifact for an accessible stage.
pub async fn record_artifact_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ArtifactRequest>,
) -> ApiResult<StageView> {
    let mut session = state.session.write().await;
    let index = session.engine().registry().resolve(&id)?;
    session.engine().ensure_accessible(index)?;

    let blob = request.artifact.unwrap_or_else(placeholder_artifact);
    session.engine_mut().record_artifact(index, blob)?;
    tracing::info!(stage = %id, "artifact recorded");

    Ok(Json(detail(&session, index)?))
}

/// Set a stage's status. Accepted on gated stages too.
pub async fn set_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<StageView> {
    let mut session = state.session.write().await;
    let index = session.engine().registry().resolve(&id)?;
    session.engine_mut().set_status(index, request.status)?;
    Ok(Json(detail(&session, index)?))
}

/// The stage after the given one, or the proof view.
pub async fn next_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<NextResponse> {
    let session = state.session.read().await;
    let registry = session.engine().registry();
    let index = registry.resolve(&id)?;

    let response = match session.engine().next_accessible_after(index)? {
        Next::Stage(i) => {
            let stage = registry.stage_at(i)?;
            NextResponse {
                next: stage.id.clone(),
                route: Some(stage.route.clone()),
                terminal: false,
            }
        }
        Next::Terminal => NextResponse {
            next: "proof".to_string(),
            route: None,
            terminal: true,
        },
    };
    Ok(Json(response))
}

// =============================================================================
// PROOF HANDLERS
// =============================================================================

/// Completion grid.
pub async fn proof_handler(State(state): State<AppState>) -> ApiResult<ProofResponse> {
    let session = state.session.read().await;
    let engine = session.engine();
    let snapshot = engine.snapshot()?;
    let accessible = accessibility(engine)?;
    Ok(Json(ProofResponse::new(&snapshot, &accessible)))
}

/// Compose the final submission.
pub async fn submission_handler(
    State(state): State<AppState>,
    Json(links): Json<ProofLinks>,
) -> ApiResult<SubmissionResponse> {
    let session = state.session.read().await;
    let snapshot = session.engine().snapshot()?;
    let submission = Submission::compose(&snapshot, &links)?;
    tracing::info!("final submission composed");
    Ok(Json(SubmissionResponse { submission }))
}

/// Clear all stage progress.
pub async fn reset_handler(State(state): State<AppState>) -> ApiResult<ProgressResponse> {
    let mut session = state.session.write().await;
    session.engine_mut().reset()?;
    Ok(Json(ProgressResponse {
        success: true,
        stages: session.engine().registry().len(),
    }))
}

// =============================================================================
// EXPORT / IMPORT HANDLERS
// =============================================================================

/// Binary progress dump.
pub async fn export_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.session.read().await;
    let data = export_progress(session.engine())?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data))
}

/// Replace progress with a binary dump.
pub async fn import_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<ProgressResponse> {
    let mut session = state.session.write().await;
    let applied = import_progress(session.engine_mut(), &body).map_err(|e| match e {
        TrackError::Serialization(_) => ApiError::bad_request(e),
        other => ApiError::from(other),
    })?;
    Ok(Json(ProgressResponse {
        success: true,
        stages: applied,
    }))
}

// =============================================================================
// RESUME HANDLERS
// =============================================================================

/// The saved resume, or the blank default.
pub async fn get_resume_handler(State(state): State<AppState>) -> ApiResult<ResumeProfile> {
    let session = state.session.read().await;
    Ok(Json(session.resume()?))
}

/// Replace the resume.
pub async fn put_resume_handler(
    State(state): State<AppState>,
    Json(profile): Json<ResumeProfile>,
) -> ApiResult<ResumeProfile> {
    let mut session = state.session.write().await;
    session.save_resume(&profile)?;
    Ok(Json(profile))
}

/// Replace the resume with sample data.
pub async fn sample_resume_handler(State(state): State<AppState>) -> ApiResult<ResumeProfile> {
    let mut session = state.session.write().await;
    let profile = ResumeProfile::sample();
    session.save_resume(&profile)?;
    Ok(Json(profile))
}

/// Append a blank item to a section.
pub async fn add_item_handler(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> ApiResult<ResumeProfile> {
    let kind = parse_section(&section)?;
    let mut session = state.session.write().await;
    let (_, profile) = session.update_resume(|p| Ok(p.add_item(kind)))?;
    Ok(Json(profile))
}

/// Remove an item from a section. The last item is kept (409).
pub async fn remove_item_handler(
    State(state): State<AppState>,
    Path((section, index)): Path<(String, usize)>,
) -> ApiResult<ResumeProfile> {
    let kind = parse_section(&section)?;
    let mut session = state.session.write().await;
    let ((), profile) = session.update_resume(|p| p.remove_item(kind, index))?;
    Ok(Json(profile))
}
