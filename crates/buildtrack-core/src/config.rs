//! # Workflow Configuration
//!
//! Serde description of a workflow's stage catalog.
//!
//! The app layer reads this from TOML; the CORE only validates it and turns
//! it into a [`StageRegistry`]. Leaving the file out yields the eight-stage
//! build track.

use crate::primitives::DEFAULT_PREFIX;
use crate::{StageRegistry, TrackError};
use serde::{Deserialize, Serialize};

/// The default build track: `(id, title, route, prompt)`.
const BUILD_TRACK: [(&str, &str, &str, &str); 8] = [
    (
        "01",
        "Problem Discovery",
        "/rb/01-problem",
        "Analyze the current resume building landscape and identify top 3 friction points.",
    ),
    (
        "02",
        "Market Analysis",
        "/rb/02-market",
        "Define the target persona and competitive advantages of an AI-first builder.",
    ),
    (
        "03",
        "Architecture Design",
        "/rb/03-architecture",
        "Outline the modular architecture: Extraction, Generation, and Formatting layers.",
    ),
    (
        "04",
        "High-Level Design",
        "/rb/04-hld",
        "Create the system context diagram and API boundary definitions.",
    ),
    (
        "05",
        "Low-Level Design",
        "/rb/05-lld",
        "Define the schema for Resume data and the prompt engineering strategy.",
    ),
    (
        "06",
        "Build Core Engine",
        "/rb/06-build",
        "Implement the React frontend with the defined design system tokens.",
    ),
    (
        "07",
        "Test & Validate",
        "/rb/07-test",
        "Execute end-to-end tests for resume generation and export functionality.",
    ),
    (
        "08",
        "Ship & Deploy",
        "/rb/08-ship",
        "Configure CI/CD pipeline and deploy to production environment.",
    ),
];

/// One stage entry as written in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    pub id: String,
    pub title: String,
    pub route: String,
    #[serde(default)]
    pub prompt: String,
}

impl StageConfig {
    /// Create a stage entry.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        route: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            route: route.into(),
            prompt: prompt.into(),
        }
    }
}

/// A workflow: storage namespace plus ordered stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "build_track_stages")]
    pub stages: Vec<StageConfig>,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn build_track_stages() -> Vec<StageConfig> {
    BUILD_TRACK
        .iter()
        .map(|(id, title, route, prompt)| StageConfig::new(*id, *title, *route, *prompt))
        .collect()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            stages: build_track_stages(),
        }
    }
}

impl WorkflowConfig {
    /// Validate and build the registry.
    pub fn into_registry(self) -> Result<StageRegistry, TrackError> {
        StageRegistry::new(self.prefix, self.stages)
    }
}
