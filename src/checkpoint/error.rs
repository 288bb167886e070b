//! Checkpoint error types.

use thiserror::Error;

/// Errors that can occur during snapshot and restore operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckpointError {
    /// Serialization to JSON or binary format failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON or binary format failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Snapshot version is not supported by this version
    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: String, supported: String },

    /// Snapshot names a state the machine does not have
    #[error("Snapshot references unknown state '{0}'")]
    UnknownState(String),
}
