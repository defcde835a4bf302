//! # Progress Export Format
//!
//! Portable, deterministic dump of a workflow's progress.
//!
//! Format: Header (13 bytes) + postcard-serialized [`ProgressDump`].
//! - 4 bytes: Magic ("BTRK")
//! - 1 byte: Version
//! - 8 bytes: FNV-1a checksum of the payload (little endian)
//!
//! Import replays the dump through public engine operations only, so it
//! works against any store and never writes raw keys.
//!
//! ## Validation
//!
//! Size, header and checksum are validated before the payload is
//! deserialized, and every entry is checked before anything is written.
//! Export refuses to produce a dump larger than import accepts.

use crate::engine::ProgressionEngine;
use crate::primitives::{EXPORT_MAGIC, EXPORT_VERSION, MAX_EXPORT_SIZE};
use crate::storage::Store;
use crate::{StageStatus, TrackError};
use serde::{Deserialize, Serialize};

const HEADER_LEN: usize = 13;

/// One stage in a dump, addressed by id rather than index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpEntry {
    pub id: String,
    pub artifact: Option<String>,
    pub status: StageStatus,
}

/// Progress of one workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressDump {
    pub prefix: String,
    pub stages: Vec<DumpEntry>,
}

impl ProgressDump {
    /// Capture the engine's current progress, in stage order.
    pub fn capture<S: Store>(engine: &ProgressionEngine<S>) -> Result<Self, TrackError> {
        let snapshot = engine.snapshot()?;
        let stages = snapshot
            .entries
            .into_iter()
            .map(|e| DumpEntry {
                id: e.stage.id,
                artifact: e.state.artifact,
                status: e.state.status,
            })
            .collect();
        Ok(Self {
            prefix: engine.registry().prefix().to_string(),
            stages,
        })
    }
}

/// 64-bit FNV-1a over `data`.
fn checksum(data: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    data.iter()
        .fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

/// Serialize the engine's progress.
pub fn export_progress<S: Store>(engine: &ProgressionEngine<S>) -> Result<Vec<u8>, TrackError> {
    let dump = ProgressDump::capture(engine)?;
    let payload =
        postcard::to_allocvec(&dump).map_err(|e| TrackError::Serialization(e.to_string()))?;

    let total = HEADER_LEN.saturating_add(payload.len());
    if total > MAX_EXPORT_SIZE {
        tracing::warn!(total, max = MAX_EXPORT_SIZE, "export too large");
        return Err(TrackError::Serialization(format!(
            "export of {} bytes would exceed maximum {}",
            total, MAX_EXPORT_SIZE
        )));
    }

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(EXPORT_MAGIC);
    bytes.push(EXPORT_VERSION);
    bytes.extend_from_slice(&checksum(&payload).to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Parse and verify an export without applying it.
pub fn decode_progress(data: &[u8]) -> Result<ProgressDump, TrackError> {
    if data.len() > MAX_EXPORT_SIZE {
        return Err(TrackError::Serialization(format!(
            "export of {} bytes exceeds maximum {}",
            data.len(),
            MAX_EXPORT_SIZE
        )));
    }
    if data.len() < HEADER_LEN {
        return Err(TrackError::Serialization("export truncated".to_string()));
    }

    let (header, payload) = data.split_at(HEADER_LEN);
    if &header[0..4] != EXPORT_MAGIC {
        return Err(TrackError::Serialization("invalid export format".to_string()));
    }
    if header[4] != EXPORT_VERSION {
        return Err(TrackError::Serialization(format!(
            "unsupported export version {} (expected {})",
            header[4], EXPORT_VERSION
        )));
    }
    let mut stored = [0u8; 8];
    stored.copy_from_slice(&header[5..HEADER_LEN]);
    if u64::from_le_bytes(stored) != checksum(payload) {
        return Err(TrackError::Serialization("checksum mismatch".to_string()));
    }

    postcard::from_bytes(payload).map_err(|e| TrackError::Serialization(e.to_string()))
}

/// Replace the engine's progress with an export.
///
/// Returns the number of stages that carried state.
pub fn import_progress<S: Store>(
    engine: &mut ProgressionEngine<S>,
    data: &[u8],
) -> Result<usize, TrackError> {
    let dump = decode_progress(data)?;

    let resolved = dump
        .stages
        .iter()
        .map(|entry| {
            if entry.artifact.is_some() && entry.status == StageStatus::Idle {
                return Err(TrackError::Serialization(format!(
                    "stage '{}' has an artifact but idle status",
                    entry.id
                )));
            }
            Ok((engine.registry().index_for_id(&entry.id)?, entry))
        })
        .collect::<Result<Vec<_>, TrackError>>()?;

    engine.reset()?;

    let mut applied = 0usize;
    for (index, entry) in resolved {
        match &entry.artifact {
            Some(artifact) => {
                engine.record_artifact(index, artifact.as_str())?;
                if entry.status != StageStatus::Success {
                    engine.set_status(index, entry.status)?;
                }
            }
            None if entry.status != StageStatus::Idle => {
                engine.set_status(index, entry.status)?;
            }
            None => continue,
        }
        applied = applied.saturating_add(1);
    }

    tracing::info!(applied, source_prefix = %dump.prefix, "progress imported");
    Ok(applied)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::WorkflowConfig;

    fn engine() -> ProgressionEngine<MemoryStore> {
        let registry = WorkflowConfig::default().into_registry().unwrap();
        ProgressionEngine::new(registry, MemoryStore::new())
    }

    fn populated() -> ProgressionEngine<MemoryStore> {
        let mut engine = engine();
        engine.record_artifact(0, "a").unwrap();
        engine.record_artifact(1, "b").unwrap();
        engine.set_status(1, StageStatus::Error).unwrap();
        engine.set_status(4, StageStatus::Error).unwrap();
        engine
    }

    #[test]
    fn export_is_deterministic() {
        let engine = populated();
        assert_eq!(export_progress(&engine).unwrap(), export_progress(&engine).unwrap());
    }

    #[test]
    fn import_restores_states() {
        let source = populated();
        let bytes = export_progress(&source).unwrap();

        let mut target = engine();
        target.record_artifact(6, "stale").unwrap();
        let applied = import_progress(&mut target, &bytes).unwrap();

        assert_eq!(applied, 3);
        assert_eq!(target.snapshot().unwrap(), source.snapshot().unwrap());
        assert!(target.state_of(6).unwrap().is_untouched());
    }

    #[test]
    fn rejects_tampered_payload() {
        let mut bytes = export_progress(&populated()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            decode_progress(&bytes),
            Err(TrackError::Serialization(msg)) if msg.contains("checksum")
        ));
    }

    #[test]
    fn rejects_bad_header() {
        assert!(decode_progress(b"BTR").is_err());

        let mut bytes = export_progress(&populated()).unwrap();
        bytes[0] = b'X';
        assert!(decode_progress(&bytes).is_err());

        let mut bytes = export_progress(&populated()).unwrap();
        bytes[4] = EXPORT_VERSION + 1;
        assert!(decode_progress(&bytes).is_err());
    }

    fn frame(dump: &ProgressDump) -> Vec<u8> {
        let payload = postcard::to_allocvec(dump).unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(EXPORT_MAGIC);
        bytes.push(EXPORT_VERSION);
        bytes.extend_from_slice(&checksum(&payload).to_le_bytes());
        bytes.extend_from_slice(&payload);
        bytes
    }

    #[test]
    fn unknown_stage_id_writes_nothing() {
        let source = populated();
        let mut dump = ProgressDump::capture(&source).unwrap();
        dump.stages[0].id = "99".to_string();
        let bytes = frame(&dump);

        let mut target = engine();
        target.record_artifact(0, "keep").unwrap();
        assert!(matches!(
            import_progress(&mut target, &bytes),
            Err(TrackError::NotFound(_))
        ));
        assert_eq!(target.state_of(0).unwrap().artifact.as_deref(), Some("keep"));
    }

    #[test]
    fn idle_status_with_artifact_writes_nothing() {
        let source = populated();
        let mut dump = ProgressDump::capture(&source).unwrap();
        dump.stages[1].status = StageStatus::Idle;
        let bytes = frame(&dump);

        let mut target = engine();
        target.record_artifact(0, "keep").unwrap();
        assert!(matches!(
            import_progress(&mut target, &bytes),
            Err(TrackError::Serialization(msg)) if msg.contains("idle")
        ));
        assert_eq!(target.state_of(0).unwrap().artifact.as_deref(), Some("keep"));
    }

    #[test]
    fn oversized_progress_is_not_exported() {
        let mut engine = engine();
        let blob = "a".repeat(6 * 1024 * 1024);
        for index in 0..3 {
            engine.record_artifact(index, blob.as_str()).unwrap();
        }

        assert!(matches!(
            export_progress(&engine),
            Err(TrackError::Serialization(msg)) if msg.contains("exceed")
        ));

        engine.reset().unwrap();
        engine.record_artifact(0, blob.as_str()).unwrap();
        let bytes = export_progress(&engine).unwrap();
        assert!(decode_progress(&bytes).is_ok());
    }
}
