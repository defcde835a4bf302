//! # CLI Command Implementations
//!
//! Every command opens a [`Session`] and goes through engine operations
//! only. Gated stages are refused here, before any write.

use super::{BackendKind, Cli, ResumeCommand};
use crate::api;
use crate::config::AppConfig;
use base64::Engine as _;
use buildtrack_core::{
    Next, ProofLinks, RedbStore, Session, StageStatus, Submission, TrackError, WorkflowSnapshot,
    codec::placeholder_artifact,
    export::{export_progress, import_progress},
    primitives::MAX_EXPORT_SIZE,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a file recorded as an artifact (8 MB).
const MAX_ARTIFACT_FILE_SIZE: u64 = 8 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), TrackError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TrackError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(TrackError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, TrackError> {
    let canonical = path.canonicalize().map_err(|e| {
        TrackError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(TrackError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path against its canonical parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, TrackError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        TrackError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(TrackError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| TrackError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub database: PathBuf,
    pub backend: BackendKind,
    pub config: AppConfig,
    pub json_mode: bool,
}

impl Context {
    /// Read the config file named on the command line, if any.
    pub fn from_cli(cli: &Cli) -> Result<Self, TrackError> {
        Ok(Self {
            database: cli.database.clone(),
            backend: cli.backend,
            config: AppConfig::load(cli.config.as_deref())?,
            json_mode: cli.json_mode,
        })
    }

    /// Open a session on the selected backend.
    pub fn open_session(&self) -> Result<Session, TrackError> {
        let registry = self.config.registry()?;
        match self.backend {
            BackendKind::Redb => Session::with_redb(&self.database, registry),
            BackendKind::Memory => Ok(Session::in_memory(registry)),
        }
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(ctx: &Context, host: &str, port: u16) -> Result<(), TrackError> {
    let session = ctx.open_session()?;

    println!("Buildtrack Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", session.backend_name());
    println!("  Database: {:?}", ctx.database);
    println!("  Stages:   {}", session.engine().registry().len());
    println!();
    println!("Endpoints:");
    println!("  GET  /stages              - List stages");
    println!("  GET  /stages/{{id}}         - Open a stage");
    println!("  POST /stages/{{id}}/artifact - Record an artifact");
    println!("  PUT  /stages/{{id}}/status  - Set status");
    println!("  GET  /proof               - Completion grid");
    println!("  POST /proof/submission    - Final submission");
    println!("  GET  /resume              - Resume profile");
    println!("  GET  /health              - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, session).await
}

// =============================================================================
// STAGES COMMAND
// =============================================================================

/// List every stage with its access, completion and status.
pub fn cmd_stages(ctx: &Context) -> Result<(), TrackError> {
    let session = ctx.open_session()?;
    let engine = session.engine();
    let snapshot = engine.snapshot()?;

    if ctx.json_mode {
        let mut rows = Vec::with_capacity(snapshot.entries.len());
        for entry in &snapshot.entries {
            rows.push(serde_json::json!({
                "index": entry.stage.index,
                "id": entry.stage.id,
                "title": entry.stage.title,
                "route": entry.stage.route,
                "accessible": engine.can_access(entry.stage.index)?,
                "completed": entry.completed,
                "status": entry.state.status,
            }));
        }
        print_json(&serde_json::json!({
            "backend": session.backend_name(),
            "stages": rows,
            "completed_count": snapshot.completed_count(),
        }));
        return Ok(());
    }

    println!("Buildtrack Stages");
    println!("=================");
    for entry in &snapshot.entries {
        let lock = if engine.can_access(entry.stage.index)? {
            "open  "
        } else {
            "locked"
        };
        let mark = if entry.completed { "x" } else { " " };
        println!(
            "  [{}] {:<4} {} {:<8} {}",
            mark,
            entry.stage.id,
            lock,
            entry.state.status.as_str(),
            entry.stage.title
        );
    }
    println!();
    println!(
        "Completed: {}/{}",
        snapshot.completed_count(),
        snapshot.entries.len()
    );

    Ok(())
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Show a stage's prompt and state, or the prerequisite when gated.
pub fn cmd_show(ctx: &Context, reference: &str) -> Result<(), TrackError> {
    let session = ctx.open_session()?;
    let engine = session.engine();
    let index = engine.registry().resolve(reference)?;
    let stage = engine.registry().stage_at(index)?;

    if let Err(denied) = engine.ensure_accessible(index) {
        if !ctx.json_mode {
            if let TrackError::AccessDenied { blocked_by, .. } = &denied {
                println!("Access Restricted");
                println!("Please complete the previous step ({}).", blocked_by);
            }
        }
        return Err(denied);
    }

    let state = engine.state_of(index)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "stage": stage,
            "state": state,
            "completed": state.completed(),
        }));
        return Ok(());
    }

    println!("{}", stage);
    println!("{}", "=".repeat(stage.to_string().chars().count()));
    println!("Route:  {}", stage.route);
    println!("Status: {}", state.status);
    match &state.artifact {
        Some(artifact) => println!("Artifact: {} bytes on record", artifact.len()),
        None => println!("Artifact: none"),
    }
    println!();
    println!("Prompt:");
    println!("  {}", stage.prompt);

    Ok(())
}

// =============================================================================
// RECORD COMMAND
// =============================================================================

/// Read a file and encode it as a base64 artifact.
fn file_artifact(path: &Path) -> Result<String, TrackError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_ARTIFACT_FILE_SIZE)?;
    let data = std::fs::read(&validated)
        .map_err(|e| TrackError::Io(format!("Read file: {}", e)))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(data))
}

/// Record an artifact for an accessible stage.
pub fn cmd_record(
    ctx: &Context,
    reference: &str,
    artifact: Option<String>,
    file: Option<&Path>,
) -> Result<(), TrackError> {
    let mut session = ctx.open_session()?;
    let index = session.engine().registry().resolve(reference)?;
    session.engine().ensure_accessible(index)?;

    let blob = match (artifact, file) {
        (Some(text), _) => text,
        (None, Some(path)) => file_artifact(path)?,
        (None, None) => placeholder_artifact(),
    };
    let size = blob.len();

    session.engine_mut().record_artifact(index, blob)?;
    let next = session.engine().next_accessible_after(index)?;
    let stage_id = session.engine().registry().stage_at(index)?.id.clone();
    let next_label = next_label(&session, next)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "stage": stage_id,
            "recorded_bytes": size,
            "next": next_label,
        }));
        return Ok(());
    }

    println!("Recorded artifact for step {} ({} bytes)", stage_id, size);
    println!("Next: {}", next_label);
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Set a stage's status.
pub fn cmd_status(ctx: &Context, reference: &str, status: StageStatus) -> Result<(), TrackError> {
    let mut session = ctx.open_session()?;
    let index = session.engine().registry().resolve(reference)?;
    session.engine_mut().set_status(index, status)?;
    let state = session.engine().state_of(index)?;
    let stage_id = session.engine().registry().stage_at(index)?.id.clone();

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "stage": stage_id,
            "state": state,
        }));
        return Ok(());
    }

    println!("Step {} marked {}", stage_id, state.status);
    if state.artifact.is_none() {
        println!("Note: no artifact on record; the next step stays locked.");
    }
    Ok(())
}

// =============================================================================
// NEXT COMMAND
// =============================================================================

/// Stage id for `Next::Stage`, `"proof"` for `Next::Terminal`.
fn next_label(session: &Session, next: Next) -> Result<String, TrackError> {
    match next {
        Next::Stage(i) => Ok(session.engine().registry().stage_at(i)?.id.clone()),
        Next::Terminal => Ok("proof".to_string()),
    }
}

/// Print the stage after the given one.
pub fn cmd_next(ctx: &Context, reference: &str) -> Result<(), TrackError> {
    let session = ctx.open_session()?;
    let index = session.engine().registry().resolve(reference)?;
    let next = session.engine().next_accessible_after(index)?;

    if ctx.json_mode {
        let route = match next {
            Next::Stage(i) => Some(session.engine().registry().stage_at(i)?.route.clone()),
            Next::Terminal => None,
        };
        print_json(&serde_json::json!({
            "next": next_label(&session, next)?,
            "route": route,
            "terminal": next == Next::Terminal,
        }));
        return Ok(());
    }

    println!("{}", next_label(&session, next)?);
    Ok(())
}

// =============================================================================
// PROOF COMMAND
// =============================================================================

fn print_grid(snapshot: &WorkflowSnapshot) {
    for entry in &snapshot.entries {
        let mark = if entry.completed { "x" } else { " " };
        println!(
            "  [{}] {} {} ({})",
            mark, entry.stage.id, entry.stage.title, entry.state.status
        );
    }
}

/// Show the completion grid and whether submission is enabled.
pub fn cmd_proof(ctx: &Context) -> Result<(), TrackError> {
    let session = ctx.open_session()?;
    let snapshot = session.engine().snapshot()?;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "entries": &snapshot.entries,
            "completed_count": snapshot.completed_count(),
            "total": snapshot.entries.len(),
            "percent": snapshot.percent(),
            "all_completed": snapshot.all_completed,
            "submission_enabled": snapshot.submission_enabled(),
        }));
        return Ok(());
    }

    println!("Build Track Proof");
    println!("=================");
    print_grid(&snapshot);
    println!();
    println!(
        "Completed: {}/{} ({}%)",
        snapshot.completed_count(),
        snapshot.entries.len(),
        snapshot.percent()
    );
    if snapshot.submission_enabled() {
        println!("Submission: enabled");
    } else {
        println!(
            "Submission: locked (pending: {})",
            snapshot.pending_ids().join(", ")
        );
    }

    Ok(())
}

// =============================================================================
// SUBMIT COMMAND
// =============================================================================

/// Compose the final submission text.
pub fn cmd_submit(
    ctx: &Context,
    lovable: String,
    github: String,
    deploy: String,
) -> Result<(), TrackError> {
    let session = ctx.open_session()?;
    let snapshot = session.engine().snapshot()?;
    let links = ProofLinks {
        lovable_project: lovable,
        github_repository: github,
        deployment_url: deploy,
    };

    let text = Submission::compose(&snapshot, &links)?;
    tracing::info!("final submission composed");

    if ctx.json_mode {
        print_json(&serde_json::json!({ "submission": text }));
    } else {
        print!("{}", text);
    }
    Ok(())
}

// =============================================================================
// RESET COMMAND
// =============================================================================

/// Clear all stage progress. Refuses without `--force` if any exists.
pub fn cmd_reset(ctx: &Context, force: bool) -> Result<(), TrackError> {
    let mut session = ctx.open_session()?;
    let snapshot = session.engine().snapshot()?;
    let touched = snapshot
        .entries
        .iter()
        .filter(|e| !e.state.is_untouched())
        .count();

    if touched > 0 && !force {
        return Err(TrackError::ConfirmationRequired(format!(
            "{} stage(s) have progress",
            touched
        )));
    }

    session.engine_mut().reset()?;
    println!("Reset {} stage(s)", touched);
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(ctx: &Context, force: bool) -> Result<(), TrackError> {
    if ctx.backend == BackendKind::Memory {
        println!("Memory backend needs no initialization");
        return Ok(());
    }

    if ctx.database.exists() {
        if !force {
            return Err(TrackError::ConfirmationRequired(
                "Database already exists".to_string(),
            ));
        }
        std::fs::remove_file(&ctx.database)
            .map_err(|e| TrackError::Io(format!("Remove database: {}", e)))?;
    }

    let _session = ctx.open_session()?;
    println!("Initialized new redb database at {:?}", ctx.database);
    Ok(())
}

// =============================================================================
// COMPACT COMMAND
// =============================================================================

/// Reclaim free space in the redb file, e.g. after a reset.
pub fn cmd_compact(ctx: &Context) -> Result<(), TrackError> {
    if ctx.backend == BackendKind::Memory {
        println!("Memory backend has nothing to compact");
        return Ok(());
    }
    if !ctx.database.exists() {
        return Err(TrackError::NotFound(format!(
            "database {:?}",
            ctx.database
        )));
    }

    let mut store = RedbStore::open(&ctx.database)?;
    store.compact()?;
    println!("Compacted {:?}", ctx.database);
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT COMMANDS
// =============================================================================

/// Write a binary progress dump.
pub fn cmd_export(ctx: &Context, output: &Path) -> Result<(), TrackError> {
    let validated_output = validate_output_path(output)?;
    let session = ctx.open_session()?;
    let data = export_progress(session.engine())?;

    std::fs::write(&validated_output, &data)
        .map_err(|e| TrackError::Io(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

/// Replace progress with a binary dump.
pub fn cmd_import(ctx: &Context, input: &Path) -> Result<(), TrackError> {
    let validated_input = validate_file_path(input)?;
    validate_file_size(&validated_input, MAX_EXPORT_SIZE as u64)?;

    let data = std::fs::read(&validated_input)
        .map_err(|e| TrackError::Io(format!("Read file: {}", e)))?;

    let mut session = ctx.open_session()?;
    let applied = import_progress(session.engine_mut(), &data)?;

    println!("Imported progress for {} stage(s)", applied);
    Ok(())
}

// =============================================================================
// RESUME COMMAND
// =============================================================================

/// Edit or print the resume profile.
pub fn cmd_resume(ctx: &Context, action: ResumeCommand) -> Result<(), TrackError> {
    let mut session = ctx.open_session()?;

    let profile = match action {
        ResumeCommand::Show => session.resume()?,
        ResumeCommand::Sample => {
            let sample = buildtrack_core::ResumeProfile::sample();
            session.save_resume(&sample)?;
            sample
        }
        ResumeCommand::Add { section } => {
            let (len, profile) = session.update_resume(|p| Ok(p.add_item(section)))?;
            if !ctx.json_mode {
                println!("{} now has {} item(s)", section, len);
            }
            profile
        }
        ResumeCommand::Remove { section, index } => {
            let ((), profile) = session.update_resume(|p| p.remove_item(section, index))?;
            if !ctx.json_mode {
                println!("Removed {} item {}", section, index);
            }
            profile
        }
        ResumeCommand::Set {
            field,
            value,
            section,
            index,
        } => {
            let ((), profile) = session.update_resume(|p| match (section, index) {
                (Some(section), Some(index)) => p.set_item_field(section, index, &field, value),
                _ => p.set_field(&field, value),
            })?;
            profile
        }
    };

    let json = serde_json::to_value(&profile)
        .map_err(|e| TrackError::Serialization(e.to_string()))?;
    print_json(&json);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use buildtrack_core::primitives::PLACEHOLDER_ARTIFACT_PREFIX;
    use tempfile::tempdir;

    fn redb_context(dir: &Path) -> Context {
        Context {
            database: dir.join("track.redb"),
            backend: BackendKind::Redb,
            config: AppConfig::default(),
            json_mode: true,
        }
    }

    #[test]
    fn record_refuses_gated_stage() {
        let temp = tempdir().expect("temp dir");
        let ctx = redb_context(temp.path());

        assert!(matches!(
            cmd_record(&ctx, "02", Some("x".to_string()), None),
            Err(TrackError::AccessDenied { .. })
        ));
        cmd_record(&ctx, "01", None, None).unwrap();
        cmd_record(&ctx, "/rb/02-market", Some("x".to_string()), None).unwrap();

        let session = ctx.open_session().unwrap();
        let first = session.engine().state_of(0).unwrap();
        assert!(first
            .artifact
            .unwrap()
            .starts_with(PLACEHOLDER_ARTIFACT_PREFIX));
        assert!(session.engine().can_access(2).unwrap());
    }

    #[test]
    fn record_file_is_base64() {
        let temp = tempdir().expect("temp dir");
        let ctx = redb_context(temp.path());
        let shot = temp.path().join("shot.bin");
        std::fs::write(&shot, b"png").unwrap();

        cmd_record(&ctx, "#0", None, Some(&shot)).unwrap();

        let session = ctx.open_session().unwrap();
        assert_eq!(
            session.engine().state_of(0).unwrap().artifact.as_deref(),
            Some("cG5n")
        );
    }

    #[test]
    fn show_gated_stage_fails() {
        let temp = tempdir().expect("temp dir");
        let ctx = redb_context(temp.path());
        assert!(cmd_show(&ctx, "01").is_ok());
        assert!(matches!(
            cmd_show(&ctx, "03"),
            Err(TrackError::AccessDenied { .. })
        ));
        assert!(matches!(cmd_show(&ctx, "99"), Err(TrackError::NotFound(_))));
    }

    #[test]
    fn reset_needs_force_when_progress_exists() {
        let temp = tempdir().expect("temp dir");
        let ctx = redb_context(temp.path());
        cmd_reset(&ctx, false).unwrap();

        cmd_status(&ctx, "05", StageStatus::Error).unwrap();
        match cmd_reset(&ctx, false) {
            Err(TrackError::ConfirmationRequired(msg)) => assert!(msg.contains("1 stage")),
            other => panic!("expected ConfirmationRequired, got {:?}", other),
        }
        cmd_reset(&ctx, true).unwrap();

        let session = ctx.open_session().unwrap();
        assert!(session.engine().state_of(4).unwrap().is_untouched());
    }

    #[test]
    fn export_then_import_into_fresh_database() {
        let temp = tempdir().expect("temp dir");
        let source = redb_context(temp.path());
        cmd_record(&source, "01", Some("a".to_string()), None).unwrap();
        cmd_status(&source, "01", StageStatus::Error).unwrap();

        let dump = temp.path().join("progress.btrk");
        cmd_export(&source, &dump).unwrap();

        let mut target = redb_context(temp.path());
        target.database = temp.path().join("other.redb");
        cmd_import(&target, &dump).unwrap();

        let session = target.open_session().unwrap();
        let state = session.engine().state_of(0).unwrap();
        assert_eq!(state.artifact.as_deref(), Some("a"));
        assert_eq!(state.status, StageStatus::Error);
    }

    #[test]
    fn init_refuses_existing_database() {
        let temp = tempdir().expect("temp dir");
        let ctx = redb_context(temp.path());
        cmd_init(&ctx, false).unwrap();
        assert!(matches!(
            cmd_init(&ctx, false),
            Err(TrackError::ConfirmationRequired(_))
        ));
        cmd_init(&ctx, true).unwrap();
    }

    #[test]
    fn compact_keeps_progress() {
        let temp = tempdir().expect("temp dir");
        let ctx = redb_context(temp.path());
        assert!(matches!(cmd_compact(&ctx), Err(TrackError::NotFound(_))));

        cmd_record(&ctx, "01", Some("a".to_string()), None).unwrap();
        cmd_record(&ctx, "02", Some("b".to_string()), None).unwrap();
        cmd_reset(&ctx, true).unwrap();
        cmd_record(&ctx, "01", Some("c".to_string()), None).unwrap();

        cmd_compact(&ctx).unwrap();

        let session = ctx.open_session().unwrap();
        assert_eq!(session.engine().state_of(0).unwrap().artifact.as_deref(), Some("c"));
        assert!(!session.engine().can_access(2).unwrap());
    }

    #[test]
    fn status_idle_is_refused() {
        let temp = tempdir().expect("temp dir");
        let ctx = redb_context(temp.path());
        cmd_status(&ctx, "03", StageStatus::Error).unwrap();
        assert!(matches!(
            cmd_status(&ctx, "03", StageStatus::Idle),
            Err(TrackError::InvalidStatus(_))
        ));
    }

    #[test]
    fn resume_edits_persist() {
        let temp = tempdir().expect("temp dir");
        let ctx = redb_context(temp.path());
        cmd_resume(&ctx, ResumeCommand::Sample).unwrap();
        cmd_resume(
            &ctx,
            ResumeCommand::Set {
                field: "company".to_string(),
                value: "Acme".to_string(),
                section: Some(buildtrack_core::SectionKind::Experience),
                index: Some(1),
            },
        )
        .unwrap();

        let session = ctx.open_session().unwrap();
        let profile = session.resume().unwrap();
        assert_eq!(profile.experience.get(1).unwrap().company, "Acme");
    }
}
