//! # Stage State Codec
//!
//! Pure mapping between a stage's [`StageState`] and the string stored for
//! it. Gating logic never looks at stored strings; it only sees decoded
//! states.
//!
//! ## Encoding
//!
//! New writes are a JSON envelope:
//!
//! ```text
//! {"artifact":"<blob>"|null,"status":"idle"|"success"|"error"}
//! ```
//!
//! Values written by the legacy browser app are the bare artifact marker
//! (e.g. `artifact_binary_data_1718000000000`). Those decode as an artifact
//! with status `success`, since that app derived `success` from artifact
//! presence. An empty legacy value decodes as untouched.

use crate::primitives::PLACEHOLDER_ARTIFACT_PREFIX;
use crate::{StageState, StageStatus, TrackError};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Storage key of the stage at 0-based `index` under `prefix`.
///
/// The on-disk scheme is 1-based: index 0 maps to `"{prefix}_step_1_artifact"`.
#[must_use]
pub fn stage_key(prefix: &str, index: usize) -> String {
    format!("{}_step_{}_artifact", prefix, index.saturating_add(1))
}

/// Marker recorded when a stage is completed without artifact content:
/// `artifact_binary_data_<unix millis>`.
#[must_use]
pub fn placeholder_artifact() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}{}", PLACEHOLDER_ARTIFACT_PREFIX, millis)
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    artifact: Option<String>,
    #[serde(default)]
    status: StageStatus,
}

/// Encode a state for storage.
pub fn encode(state: &StageState) -> Result<String, TrackError> {
    let envelope = Envelope {
        artifact: state.artifact.clone(),
        status: state.status,
    };
    serde_json::to_string(&envelope).map_err(|e| TrackError::Serialization(e.to_string()))
}

/// Decode a stored value. `None` is the untouched default.
pub fn decode(raw: Option<&str>) -> Result<StageState, TrackError> {
    let Some(raw) = raw else {
        return Ok(StageState::default());
    };

    if raw.trim_start().starts_with('{') {
        let envelope: Envelope =
            serde_json::from_str(raw).map_err(|e| TrackError::Corrupt(e.to_string()))?;
        return Ok(StageState {
            artifact: envelope.artifact,
            status: envelope.status,
        });
    }

    if raw.is_empty() {
        return Ok(StageState::default());
    }

    Ok(StageState {
        artifact: Some(raw.to_string()),
        status: StageStatus::Success,
    })
}
