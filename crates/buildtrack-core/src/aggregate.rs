//! # Completion Aggregator
//!
//! Folds per-stage state into a [`WorkflowSnapshot`].
//!
//! Snapshots are built on demand from the engine's public reads and are
//! never cached: the store may change between two calls.

use crate::engine::ProgressionEngine;
use crate::storage::Store;
use crate::{Stage, StageState, TrackError};
use serde::{Deserialize, Serialize};

/// One stage inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub stage: Stage,
    pub state: StageState,
    pub completed: bool,
}

/// Point-in-time view of every stage plus the all-complete flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub entries: Vec<SnapshotEntry>,
    pub all_completed: bool,
}

impl WorkflowSnapshot {
    /// Build from ordered entries.
    #[must_use]
    pub fn from_entries(entries: Vec<SnapshotEntry>) -> Self {
        let all_completed = entries.iter().all(|e| e.completed);
        Self {
            entries,
            all_completed,
        }
    }

    /// Number of stages with an artifact.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.completed).count()
    }

    /// Ids of stages still missing an artifact, in order.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.completed)
            .map(|e| e.stage.id.clone())
            .collect()
    }

    /// Completion as a whole percentage (integer only).
    #[must_use]
    pub fn percent(&self) -> u8 {
        let total = self.entries.len();
        if total == 0 {
            return 0;
        }
        let done = self.completed_count();
        (done.saturating_mul(100) / total).min(100) as u8
    }

    /// Admission predicate for the final submission.
    #[must_use]
    pub fn submission_enabled(&self) -> bool {
        self.all_completed
    }
}

/// Builds snapshots through the engine, never through the store.
pub struct CompletionAggregator;

impl CompletionAggregator {
    /// Read every stage once and fold the result.
    pub fn snapshot<S: Store>(
        engine: &ProgressionEngine<S>,
    ) -> Result<WorkflowSnapshot, TrackError> {
        let entries = engine
            .registry()
            .stages()
            .iter()
            .map(|stage| {
                let state = engine.state_of(stage.index)?;
                Ok(SnapshotEntry {
                    stage: stage.clone(),
                    completed: state.completed(),
                    state,
                })
            })
            .collect::<Result<Vec<_>, TrackError>>()?;
        Ok(WorkflowSnapshot::from_entries(entries))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::{StageStatus, WorkflowConfig};

    fn engine() -> ProgressionEngine<MemoryStore> {
        let registry = WorkflowConfig::default().into_registry().unwrap();
        ProgressionEngine::new(registry, MemoryStore::new())
    }

    #[test]
    fn fresh_workflow_is_pending() {
        let snapshot = engine().snapshot().unwrap();
        assert_eq!(snapshot.entries.len(), 8);
        assert!(!snapshot.all_completed);
        assert!(!snapshot.submission_enabled());
        assert_eq!(snapshot.completed_count(), 0);
        assert_eq!(snapshot.percent(), 0);
        assert_eq!(snapshot.pending_ids().first().map(String::as_str), Some("01"));
    }

    #[test]
    fn all_recorded_enables_submission() {
        let mut engine = engine();
        for i in 0..8 {
            engine.record_artifact(i, format!("a{}", i)).unwrap();
        }
        let snapshot = engine.snapshot().unwrap();
        assert!(snapshot.all_completed);
        assert!(snapshot.submission_enabled());
        assert_eq!(snapshot.percent(), 100);
        assert!(snapshot.pending_ids().is_empty());
    }

    #[test]
    fn status_does_not_affect_completion() {
        let mut engine = engine();
        for i in 0..8 {
            engine.record_artifact(i, "a").unwrap();
        }
        engine.set_status(3, StageStatus::Error).unwrap();
        let snapshot = engine.snapshot().unwrap();
        assert!(snapshot.all_completed);
        assert_eq!(snapshot.entries[3].state.status, StageStatus::Error);
    }

    #[test]
    fn snapshot_observes_intervening_write() {
        let mut engine = engine();
        let before = engine.snapshot().unwrap();
        engine.record_artifact(0, "a").unwrap();
        let after = engine.snapshot().unwrap();
        assert!(!before.entries[0].completed);
        assert!(after.entries[0].completed);
        assert_eq!(after.percent(), 12);
    }

    #[test]
    fn percent_rounds_down() {
        let mut engine = engine();
        for i in 0..3 {
            engine.record_artifact(i, "a").unwrap();
        }
        assert_eq!(engine.snapshot().unwrap().percent(), 37);
    }
}
