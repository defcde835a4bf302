//! # Session Module
//!
//! One handle over the progression engine and the resume profile, both
//! persisted in the same runtime-selected [`StoreBackend`].
//!
//! ## Storage Backends
//!
//! - `InMemory`: volatile, used by tests and `--backend memory`
//! - `Persistent`: redb file, progress and resume survive restarts

use crate::engine::ProgressionEngine;
use crate::registry::StageRegistry;
use crate::resume::{ResumeProfile, ResumeRepository};
use crate::storage::StoreBackend;
use crate::TrackError;
use std::path::Path;

/// Engine plus resume persistence.
///
/// Does NOT implement Clone: a redb handle cannot be duplicated.
#[derive(Debug)]
pub struct Session {
    engine: ProgressionEngine<StoreBackend>,
}

impl Session {
    /// Create a session over an explicit backend.
    #[must_use]
    pub fn new(registry: StageRegistry, backend: StoreBackend) -> Self {
        Self {
            engine: ProgressionEngine::new(registry, backend),
        }
    }

    /// Create a volatile in-memory session.
    #[must_use]
    pub fn in_memory(registry: StageRegistry) -> Self {
        Self::new(registry, StoreBackend::default())
    }

    /// Open or create a redb-backed session at `path`.
    pub fn with_redb(path: impl AsRef<Path>, registry: StageRegistry) -> Result<Self, TrackError> {
        let backend = StoreBackend::redb(path)?;
        Ok(Self::new(registry, backend))
    }

    /// The progression engine.
    #[must_use]
    pub fn engine(&self) -> &ProgressionEngine<StoreBackend> {
        &self.engine
    }

    /// The progression engine, for writes.
    pub fn engine_mut(&mut self) -> &mut ProgressionEngine<StoreBackend> {
        &mut self.engine
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.engine.store().is_persistent()
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.engine.store().name()
    }

    // =========================================================================
    // RESUME
    // =========================================================================

    /// Load the saved resume, or the blank default.
    pub fn resume(&self) -> Result<ResumeProfile, TrackError> {
        ResumeRepository::load(self.engine.store())
    }

    /// Replace the saved resume.
    pub fn save_resume(&mut self, profile: &ResumeProfile) -> Result<(), TrackError> {
        ResumeRepository::save(self.engine.store_mut(), profile)?;
        tracing::debug!("resume saved");
        Ok(())
    }

    /// Load, edit and save the resume in one step.
    ///
    /// Nothing is written if `edit` fails.
    pub fn update_resume<T>(
        &mut self,
        edit: impl FnOnce(&mut ResumeProfile) -> Result<T, TrackError>,
    ) -> Result<(T, ResumeProfile), TrackError> {
        let mut profile = self.resume()?;
        let out = edit(&mut profile)?;
        self.save_resume(&profile)?;
        Ok((out, profile))
    }
}
