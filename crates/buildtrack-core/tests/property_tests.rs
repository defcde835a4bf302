//! # Property-Based Tests
//!
//! Gating, recording and aggregation invariants checked with proptest over
//! random workflows and random operation sequences.

use buildtrack_core::{
    MemoryStore, ProgressionEngine, ResumeProfile, SectionKind, StageConfig, StageRegistry,
    StageStatus, TrackError,
};
use proptest::collection::vec;
use proptest::prelude::*;

// =============================================================================
// HELPERS
// =============================================================================

fn registry(n: usize) -> StageRegistry {
    let stages = (0..n)
        .map(|i| StageConfig::new(format!("{:02}", i + 1), format!("Stage {}", i + 1), format!("/p/{}", i + 1), ""))
        .collect();
    StageRegistry::new("p", stages).expect("registry")
}

fn engine(n: usize) -> ProgressionEngine<MemoryStore> {
    ProgressionEngine::new(registry(n), MemoryStore::new())
}

#[derive(Debug, Clone)]
enum Op {
    Record(usize),
    Status(usize, StageStatus),
}

/// Statuses `set_status` accepts.
fn status() -> impl Strategy<Value = StageStatus> {
    prop_oneof![
        Just(StageStatus::Success),
        Just(StageStatus::Error),
    ]
}

fn ops(n: usize) -> impl Strategy<Value = Vec<Op>> {
    vec(
        prop_oneof![
            (0..n).prop_map(Op::Record),
            (0..n, status()).prop_map(|(i, s)| Op::Status(i, s)),
        ],
        0..40,
    )
}

fn apply(engine: &mut ProgressionEngine<MemoryStore>, ops: &[Op]) {
    for op in ops {
        match op {
            Op::Record(i) => engine.record_artifact(*i, format!("blob-{}", i)).expect("record"),
            Op::Status(i, s) => engine.set_status(*i, *s).expect("status"),
        }
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Access to stage i > 0 is exactly "stage i-1 has an artifact".
    #[test]
    fn access_matches_previous_artifact(n in 1usize..10, ops in ops(10)) {
        let mut engine = engine(n);
        let ops: Vec<Op> = ops
            .into_iter()
            .filter(|op| match op {
                Op::Record(i) | Op::Status(i, _) => *i < n,
            })
            .collect();
        apply(&mut engine, &ops);

        prop_assert!(engine.can_access(0).expect("access"));
        for i in 1..n {
            let previous = engine.state_of(i - 1).expect("state");
            prop_assert_eq!(engine.can_access(i).expect("access"), previous.artifact.is_some());
        }
    }

    /// No operation sequence re-locks a stage once it is accessible.
    #[test]
    fn accessibility_is_monotonic(ops in ops(6)) {
        let mut engine = engine(6);
        let mut unlocked = vec![false; 6];
        for op in &ops {
            apply(&mut engine, std::slice::from_ref(op));
            for (i, was) in unlocked.iter_mut().enumerate() {
                let now = engine.can_access(i).expect("access");
                prop_assert!(now || !*was, "stage {} re-locked after {:?}", i, op);
                *was = now;
            }
        }
    }

    /// Recording the same artifact twice equals recording it once.
    #[test]
    fn recording_is_idempotent(n in 1usize..8, pick in 0usize..8, blob in "[a-z0-9_]{0,24}") {
        let index = pick % n;
        let mut once = engine(n);
        let mut twice = engine(n);

        once.record_artifact(index, blob.clone()).expect("record");
        twice.record_artifact(index, blob.clone()).expect("record");
        twice.record_artifact(index, blob).expect("record");

        prop_assert_eq!(once.snapshot().expect("snapshot"), twice.snapshot().expect("snapshot"));
    }

    /// Status writes never change completion or gating.
    #[test]
    fn status_is_independent_of_completion(ops in ops(5), extra in vec((0usize..5, status()), 0..10)) {
        let mut engine = engine(5);
        apply(&mut engine, &ops);
        let before: Vec<bool> = (0..5).map(|i| engine.can_access(i).expect("access")).collect();
        let completed_before = engine.snapshot().expect("snapshot").completed_count();

        for (i, s) in extra {
            engine.set_status(i, s).expect("status");
        }

        let after: Vec<bool> = (0..5).map(|i| engine.can_access(i).expect("access")).collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(engine.snapshot().expect("snapshot").completed_count(), completed_before);
    }

    /// all_completed holds exactly when every stage has an artifact.
    #[test]
    fn aggregate_matches_per_stage_state(n in 1usize..8, ops in ops(8)) {
        let mut engine = engine(n);
        let ops: Vec<Op> = ops
            .into_iter()
            .filter(|op| match op {
                Op::Record(i) | Op::Status(i, _) => *i < n,
            })
            .collect();
        apply(&mut engine, &ops);

        let snapshot = engine.snapshot().expect("snapshot");
        prop_assert_eq!(snapshot.entries.len(), n);
        let every = (0..n).all(|i| engine.state_of(i).expect("state").completed());
        prop_assert_eq!(snapshot.all_completed, every);
        prop_assert_eq!(snapshot.submission_enabled(), every);
        for (i, entry) in snapshot.entries.iter().enumerate() {
            prop_assert_eq!(entry.stage.index, i);
        }
    }

    /// Indices outside the registry are errors for every operation.
    #[test]
    fn out_of_range_is_rejected(n in 1usize..8, over in 0usize..100) {
        let mut engine = engine(n);
        let index = n + over;
        let out_of_range = |r: Result<(), TrackError>| matches!(r, Err(TrackError::OutOfRange { .. }));

        prop_assert!(out_of_range(engine.can_access(index).map(drop)));
        prop_assert!(out_of_range(engine.state_of(index).map(drop)));
        prop_assert!(out_of_range(engine.record_artifact(index, "x")));
        prop_assert!(out_of_range(engine.set_status(index, StageStatus::Error)));
        prop_assert!(out_of_range(engine.next_accessible_after(index).map(drop)));
        prop_assert!(engine.snapshot().expect("snapshot").entries.iter().all(|e| e.state.is_untouched()));
    }

    /// Once touched, a stage stays out of idle until a reset.
    #[test]
    fn touched_stages_stay_out_of_idle(ops in ops(6), index in 0usize..6) {
        let mut engine = engine(6);
        apply(&mut engine, &ops);
        let before = engine.snapshot().expect("snapshot");

        let refused = matches!(
            engine.set_status(index, StageStatus::Idle),
            Err(TrackError::InvalidStatus(_))
        );
        prop_assert!(refused);
        prop_assert_eq!(engine.snapshot().expect("snapshot"), before.clone());
        for entry in &before.entries {
            if entry.state.artifact.is_some() {
                prop_assert_ne!(entry.state.status, StageStatus::Idle);
            }
        }
    }

    /// Negative positions never resolve.
    #[test]
    fn negative_positions_are_rejected(n in 1usize..8, raw in i64::MIN..0) {
        let registry = registry(n);
        let is_out_of_range = matches!(registry.position(raw), Err(TrackError::OutOfRange { .. }));
        prop_assert!(is_out_of_range);
    }

    /// Adding then removing the new last item restores the section.
    #[test]
    fn resume_add_then_remove_restores(kind in prop_oneof![
        Just(SectionKind::Education),
        Just(SectionKind::Experience),
        Just(SectionKind::Projects),
    ], extra in 0usize..4) {
        let mut profile = ResumeProfile::sample();
        for _ in 0..extra {
            profile.add_item(kind);
        }
        let before = profile.clone();

        let len = profile.add_item(kind);
        profile.remove_item(kind, len - 1).expect("remove");

        prop_assert_eq!(profile, before);
    }

    /// Sections never drop below one item, whatever is removed.
    #[test]
    fn resume_sections_never_empty(removals in vec(0usize..5, 0..10)) {
        let mut profile = ResumeProfile::default();
        profile.add_item(SectionKind::Experience);
        profile.add_item(SectionKind::Experience);
        for index in removals {
            let _ = profile.remove_item(SectionKind::Experience, index);
            prop_assert!(profile.section_len(SectionKind::Experience) >= 1);
        }
    }
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn three_stage_walkthrough() {
    let mut engine = engine(3);

    assert!(engine.can_access(0).expect("access"));
    assert!(!engine.can_access(1).expect("access"));
    assert!(!engine.can_access(2).expect("access"));

    engine.record_artifact(0, "a").expect("record");
    assert!(engine.can_access(1).expect("access"));
    assert!(!engine.can_access(2).expect("access"));

    engine.set_status(1, StageStatus::Error).expect("status");
    assert!(!engine.can_access(2).expect("access"));

    engine.record_artifact(1, "b").expect("record");
    engine.record_artifact(2, "c").expect("record");

    let snapshot = engine.snapshot().expect("snapshot");
    assert!(snapshot.all_completed);
    assert_eq!(snapshot.percent(), 100);
}
