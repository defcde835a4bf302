//! # Primitives
//!
//! Fixed constants for the Buildtrack CORE.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! The stage catalog itself is configurable; see [`crate::config`].

/// Default storage namespace for the build track workflow.
///
/// Stage keys are `"{prefix}_step_{n}_artifact"` with a 1-based `n`.
pub const DEFAULT_PREFIX: &str = "rb";

/// Storage key holding the serialized resume profile.
pub const RESUME_KEY: &str = "resume_build_data";

/// Magic bytes for the progress export header.
pub const EXPORT_MAGIC: &[u8; 4] = b"BTRK";

/// Current progress export format version.
///
/// Increment this when making breaking changes to the export format.
pub const EXPORT_VERSION: u8 = 1;

/// Maximum accepted size of a progress export (16 MB).
///
/// Artifacts may carry base64 screenshots, so this is generous, but it is
/// checked before any deserialization happens.
pub const MAX_EXPORT_SIZE: usize = 16 * 1024 * 1024;

/// Maximum number of stages a workflow may declare.
pub const MAX_STAGES: usize = 256;

/// Marker prefix for artifacts recorded without user-supplied content.
pub const PLACEHOLDER_ARTIFACT_PREFIX: &str = "artifact_binary_data_";
