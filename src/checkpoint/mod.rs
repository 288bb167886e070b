//! Snapshot and restore for state machines.
//!
//! A snapshot is a self-contained, serializable capture of a machine's
//! current and previous state, its history and its context. It does NOT
//! include states, transitions or hooks: restoring re-resolves state names
//! against the machine being restored into, so a snapshot is only valid for
//! a compatible configuration. Persisting snapshots is up to the host.

use crate::core::{HistoryEntry, Params};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::CheckpointError;

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: &str = "1.0";

/// History entry as carried in a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub from: String,
    pub to: String,
    pub time: DateTime<Utc>,
    pub success: bool,
}

impl From<&HistoryEntry> for SnapshotRecord {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            from: entry.from.clone(),
            to: entry.to.clone(),
            time: entry.timestamp,
            success: entry.success,
        }
    }
}

impl From<SnapshotRecord> for HistoryEntry {
    fn from(record: SnapshotRecord) -> Self {
        Self {
            from: record.from,
            to: record.to,
            timestamp: record.time,
            params: Params::new(),
            success: record.success,
        }
    }
}

/// Serializable point-in-time capture of a machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Machine the snapshot was taken from
    pub machine_id: String,

    /// Name of the current state
    pub current_state_name: String,

    /// Name of the previous state, if any transition has completed
    pub previous_state_name: Option<String>,

    /// When the snapshot was taken
    pub snapshot_time: DateTime<Utc>,

    /// Serialized machine context
    pub context_data: serde_json::Value,

    /// Retained history, oldest first
    pub history: Vec<SnapshotRecord>,

    /// Snapshot format version
    pub version: String,
}

/// Binary wire form. bincode cannot decode self-describing values, so the
/// context travels as JSON text.
#[derive(Serialize, Deserialize)]
struct BinarySnapshot {
    machine_id: String,
    current_state_name: String,
    previous_state_name: Option<String>,
    snapshot_time: DateTime<Utc>,
    context_json: String,
    history: Vec<SnapshotRecord>,
    version: String,
}

impl Snapshot {
    /// Reject snapshots written by an incompatible format version.
    pub fn check_version(&self) -> Result<(), CheckpointError> {
        if self.version == SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(CheckpointError::UnsupportedVersion {
                found: self.version.clone(),
                supported: SNAPSHOT_VERSION.to_string(),
            })
        }
    }

    /// Decode the context payload.
    pub fn context_as<T: DeserializeOwned>(&self) -> Result<T, CheckpointError> {
        serde_json::from_value(self.context_data.clone())
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, CheckpointError> {
        let context_json = serde_json::to_string(&self.context_data)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))?;
        let wire = BinarySnapshot {
            machine_id: self.machine_id.clone(),
            current_state_name: self.current_state_name.clone(),
            previous_state_name: self.previous_state_name.clone(),
            snapshot_time: self.snapshot_time,
            context_json,
            history: self.history.clone(),
            version: self.version.clone(),
        };
        bincode::serialize(&wire).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let wire: BinarySnapshot = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        let context_data = serde_json::from_str(&wire.context_json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        let snapshot = Self {
            machine_id: wire.machine_id,
            current_state_name: wire.current_state_name,
            previous_state_name: wire.previous_state_name,
            snapshot_time: wire.snapshot_time,
            context_data,
            history: wire.history,
            version: wire.version,
        };
        snapshot.check_version()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Snapshot {
        Snapshot {
            machine_id: "payment-1".to_string(),
            current_state_name: "Completed".to_string(),
            previous_state_name: Some("Processing".to_string()),
            snapshot_time: Utc::now(),
            context_data: json!({ "amount": 100, "currency": "EUR" }),
            history: vec![SnapshotRecord {
                from: "Initiated".to_string(),
                to: "Processing".to_string(),
                time: Utc::now(),
                success: true,
            }],
            version: SNAPSHOT_VERSION.to_string(),
        }
    }

    #[test]
    fn json_form_uses_documented_field_names() {
        let value = serde_json::to_value(sample()).unwrap();

        for field in [
            "machine_id",
            "current_state_name",
            "previous_state_name",
            "snapshot_time",
            "context_data",
            "history",
            "version",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["history"][0]["success"], true);
    }

    #[test]
    fn json_restores_identical_snapshot() {
        let snapshot = sample();

        let restored = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(restored, snapshot);
    }

    #[test]
    fn binary_carries_context() {
        let snapshot = sample();

        let restored = Snapshot::from_binary(&snapshot.to_binary().unwrap()).unwrap();

        assert_eq!(restored.context_data, snapshot.context_data);
        assert_eq!(restored.previous_state_name.as_deref(), Some("Processing"));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut snapshot = sample();
        snapshot.version = "0.9".to_string();

        let err = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap_err();

        assert!(matches!(err, CheckpointError::UnsupportedVersion { .. }));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = Snapshot::from_binary(&[1, 2, 3]).unwrap_err();

        assert!(matches!(err, CheckpointError::DeserializationFailed(_)));
    }

    #[test]
    fn context_decodes_into_host_type() {
        #[derive(Deserialize)]
        struct Payment {
            amount: u64,
        }

        let payment: Payment = sample().context_as().unwrap();

        assert_eq!(payment.amount, 100);
    }

    #[test]
    fn records_convert_to_history_entries() {
        let record = sample().history.remove(0);

        let entry = HistoryEntry::from(record.clone());

        assert_eq!(SnapshotRecord::from(&entry), record);
        assert!(entry.params.is_empty());
    }
}
