//! # Stage Registry
//!
//! The static, ordered catalog of a workflow's stages.
//!
//! Built once at startup and never mutated. Indices are dense: stage `i`
//! sits at position `i`, and index 0 always exists.

use crate::config::StageConfig;
use crate::primitives::MAX_STAGES;
use crate::{Stage, TrackError};
use std::collections::BTreeSet;

/// Ordered stage catalog plus the storage namespace of its workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRegistry {
    prefix: String,
    stages: Vec<Stage>,
}

impl StageRegistry {
    /// Validate a stage list and assign indices in the given order.
    ///
    /// Rejects an empty list, more than `MAX_STAGES` entries, blank or
    /// duplicate ids, duplicate routes, and a prefix that is blank or
    /// contains whitespace.
    pub fn new(prefix: impl Into<String>, stages: Vec<StageConfig>) -> Result<Self, TrackError> {
        let prefix = prefix.into();
        if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
            return Err(TrackError::InvalidRegistry(format!(
                "prefix '{}' must be non-empty and contain no whitespace",
                prefix
            )));
        }
        if stages.is_empty() {
            return Err(TrackError::InvalidRegistry(
                "workflow declares no stages".to_string(),
            ));
        }
        if stages.len() > MAX_STAGES {
            return Err(TrackError::InvalidRegistry(format!(
                "workflow declares {} stages (max {})",
                stages.len(),
                MAX_STAGES
            )));
        }

        let mut ids = BTreeSet::new();
        let mut routes = BTreeSet::new();
        for stage in &stages {
            if stage.id.trim().is_empty() {
                return Err(TrackError::InvalidRegistry("blank stage id".to_string()));
            }
            if !ids.insert(stage.id.as_str()) {
                return Err(TrackError::InvalidRegistry(format!(
                    "duplicate stage id '{}'",
                    stage.id
                )));
            }
            if !routes.insert(stage.route.as_str()) {
                return Err(TrackError::InvalidRegistry(format!(
                    "duplicate route '{}'",
                    stage.route
                )));
            }
        }

        let stages = stages
            .into_iter()
            .enumerate()
            .map(|(index, s)| Stage {
                index,
                id: s.id,
                title: s.title,
                route: s.route,
                prompt: s.prompt,
            })
            .collect();

        Ok(Self { prefix, stages })
    }

    /// Storage namespace of this workflow.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// All stages in order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages (N).
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false for a constructed registry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Fail with `OutOfRange` unless `index < len`.
    pub fn check(&self, index: usize) -> Result<(), TrackError> {
        if index < self.stages.len() {
            Ok(())
        } else {
            Err(TrackError::out_of_range(index, self.stages.len()))
        }
    }

    /// Stage at `index`.
    pub fn stage_at(&self, index: usize) -> Result<&Stage, TrackError> {
        self.stages
            .get(index)
            .ok_or_else(|| TrackError::out_of_range(index, self.stages.len()))
    }

    /// Convert an untrusted signed index, rejecting negatives and `>= len`.
    pub fn position(&self, raw: i64) -> Result<usize, TrackError> {
        usize::try_from(raw)
            .ok()
            .filter(|&i| i < self.stages.len())
            .ok_or(TrackError::OutOfRange {
                index: raw,
                len: self.stages.len(),
            })
    }

    /// Index of the stage with the given id.
    ///
    /// Ids are compared as strings; they need not be numeric or contiguous.
    pub fn index_for_id(&self, id: &str) -> Result<usize, TrackError> {
        self.stages
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| TrackError::NotFound(format!("stage '{}'", id)))
    }

    /// Index of the stage mounted at `route`.
    ///
    /// Matches the full route or its trailing path segments, so
    /// `"03-architecture"` and `"/rb/03-architecture"` both resolve.
    pub fn index_for_route(&self, route: &str) -> Result<usize, TrackError> {
        let wanted = route.trim_start_matches('/');
        if wanted.is_empty() {
            return Err(TrackError::NotFound(format!("route '{}'", route)));
        }
        self.stages
            .iter()
            .position(|s| {
                let mounted = s.route.trim_start_matches('/');
                mounted == wanted || s.route.ends_with(&format!("/{}", wanted))
            })
            .ok_or_else(|| TrackError::NotFound(format!("route '{}'", route)))
    }

    /// Resolve a user-supplied stage reference.
    ///
    /// Accepted forms, tried in order: `#<index>`, stage id, route.
    pub fn resolve(&self, reference: &str) -> Result<usize, TrackError> {
        let reference = reference.trim();
        if let Some(raw) = reference.strip_prefix('#') {
            let raw: i64 = raw
                .parse()
                .map_err(|_| TrackError::NotFound(format!("stage '{}'", reference)))?;
            return self.position(raw);
        }
        self.index_for_id(reference)
            .or_else(|_| self.index_for_route(reference))
            .map_err(|_| TrackError::NotFound(format!("stage '{}'", reference)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::WorkflowConfig;

    fn build_track() -> StageRegistry {
        WorkflowConfig::default().into_registry().expect("registry")
    }

    fn three(ids: [&str; 3]) -> Vec<StageConfig> {
        ids.iter()
            .map(|id| StageConfig::new(*id, *id, format!("/t/{}", id), ""))
            .collect()
    }

    #[test]
    fn indices_follow_declaration_order() {
        let registry = build_track();
        for (i, stage) in registry.stages().iter().enumerate() {
            assert_eq!(stage.index, i);
        }
        assert_eq!(registry.stage_at(2).unwrap().title, "Architecture Design");
    }

    #[test]
    fn stage_at_out_of_range() {
        let registry = build_track();
        assert!(matches!(
            registry.stage_at(8),
            Err(TrackError::OutOfRange { index: 8, len: 8 })
        ));
    }

    #[test]
    fn position_rejects_negative() {
        let registry = build_track();
        assert!(matches!(
            registry.position(-1),
            Err(TrackError::OutOfRange { index: -1, len: 8 })
        ));
        assert_eq!(registry.position(7).unwrap(), 7);
    }

    #[test]
    fn ids_need_not_be_numeric() {
        let registry = StageRegistry::new("t", three(["alpha", "beta", "gamma"])).unwrap();
        assert_eq!(registry.index_for_id("gamma").unwrap(), 2);
        assert!(matches!(
            registry.index_for_id("delta"),
            Err(TrackError::NotFound(_))
        ));
    }

    #[test]
    fn route_matches_suffix() {
        let registry = build_track();
        assert_eq!(registry.index_for_route("03-architecture").unwrap(), 2);
        assert_eq!(registry.index_for_route("/rb/03-architecture").unwrap(), 2);
        assert_eq!(registry.index_for_route("rb/08-ship").unwrap(), 7);
        assert!(registry.index_for_route("architecture").is_err());
        assert!(registry.index_for_route("/").is_err());
    }

    #[test]
    fn resolve_accepts_all_forms() {
        let registry = build_track();
        assert_eq!(registry.resolve("04").unwrap(), 3);
        assert_eq!(registry.resolve("04-hld").unwrap(), 3);
        assert_eq!(registry.resolve("#3").unwrap(), 3);
        assert!(matches!(
            registry.resolve("#8"),
            Err(TrackError::OutOfRange { .. })
        ));
        assert!(matches!(
            registry.resolve("#x"),
            Err(TrackError::NotFound(_))
        ));
        assert!(matches!(
            registry.resolve("nope"),
            Err(TrackError::NotFound(_))
        ));
    }

    #[test]
    fn rejects_empty_workflow() {
        assert!(matches!(
            StageRegistry::new("t", Vec::new()),
            Err(TrackError::InvalidRegistry(_))
        ));
    }

    #[test]
    fn rejects_duplicate_ids_and_routes() {
        let mut stages = three(["a", "b", "c"]);
        stages[2].id = "a".to_string();
        assert!(StageRegistry::new("t", stages).is_err());

        let mut stages = three(["a", "b", "c"]);
        stages[1].route = "/t/a".to_string();
        assert!(StageRegistry::new("t", stages).is_err());
    }

    #[test]
    fn rejects_bad_prefix() {
        assert!(StageRegistry::new("", three(["a", "b", "c"])).is_err());
        assert!(StageRegistry::new("r b", three(["a", "b", "c"])).is_err());
    }
}
