//! # Progression Engine
//!
//! Sequential stage gating over an injected [`Store`].
//!
//! ## Gating Rule
//!
//! Stage 0 is always accessible. Stage `i > 0` is accessible iff stage
//! `i - 1` has an artifact. Status never takes part in gating.
//!
//! ## Writes
//!
//! `record_artifact` and `set_status` each touch exactly one stage key
//! through [`Store::update`]. Neither checks accessibility: gating is a read
//! concern, enforced by the presentation layer before it offers a write.
//!
//! ## Per-Stage State Machine
//!
//! ```text
//! idle ──record_artifact──▶ success
//!   │                         ▲  │
//!   └──set_status──▶ error ◀──┘──┘ (set_status)
//! ```
//!
//! No operation here returns a stage to idle; only [`ProgressionEngine::reset`]
//! clears the whole workflow.

use crate::aggregate::{CompletionAggregator, WorkflowSnapshot};
use crate::codec::{decode, encode, stage_key};
use crate::registry::StageRegistry;
use crate::storage::Store;
use crate::{StageState, StageStatus, TrackError};
use serde::{Deserialize, Serialize};

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum Access {
    Granted,
    /// The stage at `blocked_by` still needs an artifact.
    Denied { blocked_by: usize },
}

impl Access {
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Access::Granted)
    }
}

/// Where to go after a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "next", content = "index", rename_all = "snake_case")]
pub enum Next {
    /// Another stage, by index.
    Stage(usize),
    /// Past the last stage: the completion / proof view.
    Terminal,
}

// =============================================================================
// ENGINE
// =============================================================================

/// The progression engine: a stage registry bound to a store.
#[derive(Debug)]
pub struct ProgressionEngine<S> {
    registry: StageRegistry,
    store: S,
}

impl<S: Store> ProgressionEngine<S> {
    /// Bind a registry to a store.
    #[must_use]
    pub fn new(registry: StageRegistry, store: S) -> Self {
        Self { registry, store }
    }

    /// The stage catalog.
    #[must_use]
    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the engine, returning its store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    fn key(&self, index: usize) -> String {
        stage_key(self.registry.prefix(), index)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Current state of a stage; untouched stages read as idle.
    pub fn state_of(&self, index: usize) -> Result<StageState, TrackError> {
        self.registry.check(index)?;
        let raw = self.store.get(&self.key(index)).inspect_err(|e| {
            tracing::warn!(index, error = %e, "store read failed");
        })?;
        decode(raw.as_deref())
    }

    /// Whether the stage may be shown.
    pub fn can_access(&self, index: usize) -> Result<bool, TrackError> {
        Ok(self.access(index)?.is_granted())
    }

    /// Access check that names the blocking stage on denial.
    pub fn access(&self, index: usize) -> Result<Access, TrackError> {
        self.registry.check(index)?;
        let Some(previous) = index.checked_sub(1) else {
            return Ok(Access::Granted);
        };
        if self.state_of(previous)?.completed() {
            Ok(Access::Granted)
        } else {
            tracing::debug!(index, blocked_by = previous, "stage access denied");
            Ok(Access::Denied {
                blocked_by: previous,
            })
        }
    }

    /// Like [`Self::access`], but a denial becomes `TrackError::AccessDenied`
    /// naming both stages by id.
    pub fn ensure_accessible(&self, index: usize) -> Result<(), TrackError> {
        match self.access(index)? {
            Access::Granted => Ok(()),
            Access::Denied { blocked_by } => Err(TrackError::AccessDenied {
                stage: self.registry.stage_at(index)?.id.clone(),
                blocked_by: self.registry.stage_at(blocked_by)?.id.clone(),
            }),
        }
    }

    /// The stage after `index`, or `Terminal` after the last one.
    ///
    /// Says nothing about whether the next stage is accessible yet.
    pub fn next_accessible_after(&self, index: usize) -> Result<Next, TrackError> {
        self.registry.check(index)?;
        let next = index.saturating_add(1);
        if next < self.registry.len() {
            Ok(Next::Stage(next))
        } else {
            Ok(Next::Terminal)
        }
    }

    /// First stage without an artifact, or `Terminal` when all are done.
    ///
    /// The returned stage is always accessible.
    pub fn current_stage(&self) -> Result<Next, TrackError> {
        for index in 0..self.registry.len() {
            if !self.state_of(index)?.completed() {
                return Ok(Next::Stage(index));
            }
        }
        Ok(Next::Terminal)
    }

    /// Point-in-time view of every stage.
    pub fn snapshot(&self) -> Result<WorkflowSnapshot, TrackError> {
        CompletionAggregator::snapshot(self)
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Store an artifact for a stage and mark it `success`.
    ///
    /// Overwrites any earlier artifact. Repeating the call with the same blob
    /// leaves the same state as calling it once.
    pub fn record_artifact(
        &mut self,
        index: usize,
        artifact: impl Into<String>,
    ) -> Result<(), TrackError> {
        self.registry.check(index)?;
        let artifact = artifact.into();
        let key = self.key(index);
        self.store
            .update(&key, &mut |current| {
                let mut state = decode(current)?;
                state.artifact = Some(artifact.clone());
                state.status = StageStatus::Success;
                encode(&state)
            })
            .inspect_err(|e| tracing::warn!(index, error = %e, "recording artifact failed"))?;
        tracing::debug!(index, "artifact recorded");
        Ok(())
    }

    /// Set a stage's status to `success` or `error` without touching its
    /// artifact.
    ///
    /// Accepted for any valid index, including stages that are still gated.
    /// `idle` is refused with `InvalidStatus`: only [`Self::reset`] returns
    /// stages to idle.
    pub fn set_status(&mut self, index: usize, status: StageStatus) -> Result<(), TrackError> {
        self.registry.check(index)?;
        if status == StageStatus::Idle {
            return Err(TrackError::InvalidStatus(
                "idle cannot be set (expected success or error)".to_string(),
            ));
        }
        let key = self.key(index);
        self.store
            .update(&key, &mut |current| {
                let mut state = decode(current)?;
                state.status = status;
                encode(&state)
            })
            .inspect_err(|e| tracing::warn!(index, error = %e, "setting status failed"))?;
        tracing::debug!(index, %status, "status set");
        Ok(())
    }

    /// Clear every stage of this workflow.
    ///
    /// Keys outside this workflow's namespace are left alone.
    pub fn reset(&mut self) -> Result<(), TrackError> {
        for index in 0..self.registry.len() {
            let key = self.key(index);
            self.store.remove(&key)?;
        }
        tracing::info!(prefix = self.registry.prefix(), "workflow reset");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
