//! # buildtrack-core
//!
//! The step progression and persistence engine for Buildtrack - THE LOGIC.
//!
//! This crate decides which stage of an ordered workflow a user may open,
//! records per-stage status and artifact evidence, persists both across
//! sessions, and folds them into a completion snapshot that unlocks the
//! final submission.
//!
//! ## Layout
//!
//! - `registry` / `config`: the static, ordered stage catalog
//! - `storage`: the `Store` trait plus in-memory and redb backends
//! - `codec`: stage state <-> stored string
//! - `engine`: gating, artifact recording, status
//! - `aggregate`: workflow snapshot and the submission predicate
//! - `submission`: final submission text for a completed workflow
//! - `export`: portable binary dump of workflow progress
//! - `resume`: the resume profile edited next to the workflow
//! - `session`: engine + resume persistence behind one handle
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Never reads or writes storage keys on behalf of callers; presentation
//!   code goes through engine operations only
//! - Has NO async, NO network dependencies (pure Rust)
//! - Never panics; every failure is a `TrackError`

// =============================================================================
// MODULES
// =============================================================================

pub mod aggregate;
pub mod codec;
pub mod config;
pub mod engine;
pub mod export;
pub mod primitives;
pub mod registry;
pub mod resume;
pub mod session;
pub mod storage;
pub mod submission;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Stage, StageState, StageStatus, TrackError};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use aggregate::{CompletionAggregator, SnapshotEntry, WorkflowSnapshot};
pub use config::{StageConfig, WorkflowConfig};
pub use engine::{Access, Next, ProgressionEngine};
pub use registry::StageRegistry;
pub use session::Session;
pub use submission::{ProofLinks, Submission};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use storage::{MemoryStore, RedbStore, Store, StoreBackend};

// =============================================================================
// RE-EXPORTS: Resume & Formats
// =============================================================================

pub use export::{ProgressDump, export_progress, import_progress};
pub use resume::{
    Education, Experience, Links, PersonalInfo, Project, ResumeProfile, Section, SectionKind,
};
