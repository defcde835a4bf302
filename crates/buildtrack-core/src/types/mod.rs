//! # Core Type Definitions
//!
//! This module contains the shared types of the Buildtrack CORE:
//! - Stage descriptors (`Stage`)
//! - Per-stage state (`StageStatus`, `StageState`)
//! - Error types (`TrackError`)
//!
//! Stages are immutable once the registry is built. Stage state is never
//! held here beyond a single read; the store is the source of truth.

use crate::resume::SectionKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// STAGE
// =============================================================================

/// One ordered unit of the workflow.
///
/// `index` is the 0-based position inside the registry and defines the total
/// order. `prompt` is handed to the presentation layer as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// 0-based position, unique within a registry.
    pub index: usize,
    /// Stable short identifier, e.g. `"01"`.
    pub id: String,
    /// Human label.
    pub title: String,
    /// Route the presentation layer mounts the stage under.
    pub route: String,
    /// Opaque prompt text.
    pub prompt: String,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {}: {}", self.id, self.title)
    }
}

// =============================================================================
// STAGE STATUS
// =============================================================================

/// User-reported outcome of a stage.
///
/// Independent of completion: a stage with an artifact may still be marked
/// `Error`, and `Success` does not by itself unlock the next stage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Idle,
    Success,
    Error,
}

impl StageStatus {
    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Idle => "idle",
            StageStatus::Success => "success",
            StageStatus::Error => "error",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" => Ok(StageStatus::Idle),
            "success" => Ok(StageStatus::Success),
            "error" => Ok(StageStatus::Error),
            other => Err(TrackError::InvalidStatus(format!(
                "'{}' (expected idle, success, or error)",
                other
            ))),
        }
    }
}

// =============================================================================
// STAGE STATE
// =============================================================================

/// The persisted state of one stage.
///
/// Absence in the store decodes to `StageState::default()`: idle, no artifact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageState {
    /// Opaque evidence blob. Only its presence matters to the engine.
    pub artifact: Option<String>,
    /// User-reported status.
    pub status: StageStatus,
}

impl StageState {
    /// A stage is completed once an artifact has been recorded.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.artifact.is_some()
    }

    /// True if the stage has never been written.
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.artifact.is_none() && self.status == StageStatus::Idle
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Buildtrack CORE.
///
/// - No silent failures
/// - Use `Result<T, TrackError>` for fallible operations
/// - The CORE should never panic; all errors are recoverable by the caller
#[derive(Debug, Error)]
pub enum TrackError {
    /// A stage index outside `[0, len)` was requested.
    #[error("Stage index {index} out of range (workflow has {len} stages)")]
    OutOfRange { index: i64, len: usize },

    /// No stage or field matches the given name.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A status name that does not parse, or a status that cannot be set.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// A destructive command needs explicit confirmation.
    #[error("{0}; rerun with --force")]
    ConfirmationRequired(String),

    /// A gated stage was opened or written by the presentation layer.
    #[error("Access restricted: complete step {blocked_by} before step {stage}")]
    AccessDenied { stage: String, blocked_by: String },

    /// Removing the item would leave a resume section empty.
    #[error("Cannot remove the last {0} entry")]
    LastItem(SectionKind),

    /// A resume section item index is out of range.
    #[error("{section} has no item {index} (length {len})")]
    ItemOutOfRange {
        section: SectionKind,
        index: usize,
        len: usize,
    },

    /// Submission requested before every stage has an artifact.
    #[error("Submission locked: {} stage(s) pending ({})", pending.len(), pending.join(", "))]
    SubmissionLocked { pending: Vec<String> },

    /// A proof link is missing or not an absolute http(s) URL.
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    /// The stage catalog violates an ordering or uniqueness rule.
    #[error("Invalid stage registry: {0}")]
    InvalidRegistry(String),

    /// A stored value could not be decoded.
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The storage backend failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TrackError {
    /// Build an `OutOfRange` error from an unsigned index.
    #[must_use]
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::OutOfRange {
            index: i64::try_from(index).unwrap_or(i64::MAX),
            len,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle_and_incomplete() {
        let state = StageState::default();
        assert_eq!(state.status, StageStatus::Idle);
        assert!(!state.completed());
        assert!(state.is_untouched());
    }

    #[test]
    fn error_status_does_not_clear_completion() {
        let state = StageState {
            artifact: Some("shot".to_string()),
            status: StageStatus::Error,
        };
        assert!(state.completed());
        assert!(!state.is_untouched());
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Success".parse::<StageStatus>().ok(), Some(StageStatus::Success));
        assert_eq!(" error ".parse::<StageStatus>().ok(), Some(StageStatus::Error));
        assert!(matches!(
            "done".parse::<StageStatus>(),
            Err(TrackError::InvalidStatus(msg)) if msg.contains("'done'")
        ));
    }

    #[test]
    fn status_display_matches_wire_name() {
        assert_eq!(StageStatus::Idle.to_string(), "idle");
        assert_eq!(StageStatus::Error.to_string(), "error");
    }

    #[test]
    fn submission_locked_lists_pending() {
        let err = TrackError::SubmissionLocked {
            pending: vec!["02".to_string(), "05".to_string()],
        };
        assert_eq!(err.to_string(), "Submission locked: 2 stage(s) pending (02, 05)");
    }
}
