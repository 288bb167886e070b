//! Machine configuration.

use crate::core::DEFAULT_HISTORY_CAPACITY;
use crate::effects::DEFAULT_EVENT_CAPACITY;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Settings applied when a machine is assembled.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use statekeeper::config::MachineConfig;
///
/// let config = MachineConfig::from_json(r#"{ "history_capacity": 50 }"#).unwrap();
/// assert_eq!(config.history_capacity, 50);
/// assert_eq!(config.event_capacity, 256);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Identifier carried into snapshots and log spans
    pub machine_id: String,

    /// Maximum number of history entries retained
    pub history_capacity: usize,

    /// Buffer of the notification channel
    pub event_capacity: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            machine_id: Uuid::new_v4().to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl MachineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_generate_unique_ids() {
        let first = MachineConfig::default();
        let second = MachineConfig::default();

        assert_ne!(first.machine_id, second.machine_id);
        assert!(Uuid::parse_str(&first.machine_id).is_ok());
        assert_eq!(first.history_capacity, DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn json_overrides_selected_fields() {
        let config =
            MachineConfig::from_json(r#"{ "machine_id": "payment-42", "event_capacity": 8 }"#)
                .unwrap();

        assert_eq!(config.machine_id, "payment-42");
        assert_eq!(config.event_capacity, 8);
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(MachineConfig::from_json(r#"{ "history_capacity": "lots" }"#).is_err());
    }
}
