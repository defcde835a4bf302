//! # App Configuration
//!
//! Optional TOML file passed with `--config`:
//!
//! ```toml
//! [workflow]
//! prefix = "rb"
//!
//! [[workflow.stages]]
//! id = "01"
//! title = "Problem Discovery"
//! route = "/rb/01-problem"
//! prompt = "..."
//! ```
//!
//! A missing `[workflow]` table (or no file at all) yields the default
//! eight-stage build track.

use buildtrack_core::{StageRegistry, TrackError, WorkflowConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum config file size (1 MB).
const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

/// Top-level config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub workflow: WorkflowConfig,
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, TrackError> {
        toml::from_str(text).map_err(|e| TrackError::Serialization(format!("Config: {}", e)))
    }

    /// Read the config at `path`, or the default when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, TrackError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            TrackError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(TrackError::Serialization(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            TrackError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)?;
        tracing::info!(
            path = %path.display(),
            stages = config.workflow.stages.len(),
            "loaded workflow config"
        );
        Ok(config)
    }

    /// Validate the workflow and build its registry.
    pub fn registry(&self) -> Result<StageRegistry, TrackError> {
        self.workflow.clone().into_registry()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_is_default_track() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.registry().unwrap().len(), 8);
    }

    #[test]
    fn custom_stages_replace_the_track() {
        let config = AppConfig::from_toml(
            r#"
            [workflow]
            prefix = "demo"

            [[workflow.stages]]
            id = "a"
            title = "First"
            route = "/demo/a"

            [[workflow.stages]]
            id = "b"
            title = "Second"
            route = "/demo/b"
            prompt = "Do the second thing."
            "#,
        )
        .unwrap();

        let registry = config.registry().unwrap();
        assert_eq!(registry.prefix(), "demo");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.stage_at(1).unwrap().prompt, "Do the second thing.");
        assert_eq!(registry.stage_at(0).unwrap().prompt, "");
    }

    #[test]
    fn duplicate_ids_fail_validation() {
        let config = AppConfig::from_toml(
            r#"
            [[workflow.stages]]
            id = "a"
            title = "One"
            route = "/x/1"

            [[workflow.stages]]
            id = "a"
            title = "Two"
            route = "/x/2"
            "#,
        )
        .unwrap();
        assert!(matches!(config.registry(), Err(TrackError::InvalidRegistry(_))));
    }

    #[test]
    fn malformed_toml_is_a_serialization_error() {
        assert!(matches!(
            AppConfig::from_toml("[workflow"),
            Err(TrackError::Serialization(_))
        ));
    }

    #[test]
    fn load_reads_file_or_defaults() {
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());

        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("buildtrack.toml");
        std::fs::write(&path, "[workflow]\nprefix = \"x\"\n").unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.workflow.prefix, "x");
        assert_eq!(config.workflow.stages.len(), 8);

        assert!(matches!(
            AppConfig::load(Some(&temp.path().join("missing.toml"))),
            Err(TrackError::Io(_))
        ));
    }
}
