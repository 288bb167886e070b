//! Change notifications published by a running machine.
//!
//! Delivery is a `tokio::sync::broadcast` channel: every subscriber sees
//! every event sent after it subscribed, slow subscribers may lag, and
//! nothing is persisted. Hosts subscribe to drive side effects such as
//! writing the new status to storage.

use crate::core::Params;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// Default buffer of the notification channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A notification about machine activity.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MachineEvent {
    /// The current state is about to be exited.
    StateChanging {
        from: String,
        to: String,
        params: Params,
        timestamp: DateTime<Utc>,
    },
    /// The target state has been entered.
    StateChanged {
        from: String,
        to: String,
        params: Params,
        timestamp: DateTime<Utc>,
    },
    /// Guards passed; the transition action is about to run.
    TransitionExecuting {
        transition: String,
        from: String,
        to: String,
        params: Params,
        timestamp: DateTime<Utc>,
    },
    /// The transition completed and was recorded in history.
    TransitionExecuted {
        transition: String,
        from: String,
        to: String,
        params: Params,
        timestamp: DateTime<Utc>,
    },
    /// A transition request failed; the machine is unchanged.
    ErrorOccurred {
        transition: Option<String>,
        state: String,
        message: String,
        params: Params,
        timestamp: DateTime<Utc>,
    },
}

impl MachineEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::StateChanging { timestamp, .. }
            | Self::StateChanged { timestamp, .. }
            | Self::TransitionExecuting { timestamp, .. }
            | Self::TransitionExecuted { timestamp, .. }
            | Self::ErrorOccurred { timestamp, .. } => *timestamp,
        }
    }

    pub fn params(&self) -> &Params {
        match self {
            Self::StateChanging { params, .. }
            | Self::StateChanged { params, .. }
            | Self::TransitionExecuting { params, .. }
            | Self::TransitionExecuted { params, .. }
            | Self::ErrorOccurred { params, .. } => params,
        }
    }

    /// Channel name, for logging and filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StateChanging { .. } => "state_changing",
            Self::StateChanged { .. } => "state_changed",
            Self::TransitionExecuting { .. } => "transition_executing",
            Self::TransitionExecuted { .. } => "transition_executed",
            Self::ErrorOccurred { .. } => "error_occurred",
        }
    }
}

pub(crate) struct Notifier {
    sender: broadcast::Sender<MachineEvent>,
}

impl Notifier {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<MachineEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers. Having none is not an error.
    pub(crate) fn emit(&self, event: MachineEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}
