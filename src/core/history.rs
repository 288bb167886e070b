//! State transition history tracking.
//!
//! Provides a bounded, append-only log of completed transitions. Once the
//! configured capacity is reached the oldest entries are evicted first.

use super::Params;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Default number of entries a machine retains.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Record of a single completed transition.
///
/// # Example
///
/// ```rust
/// use statekeeper::core::{HistoryEntry, Params};
/// use chrono::Utc;
///
/// let entry = HistoryEntry {
///     from: "Initiated".to_string(),
///     to: "Processing".to_string(),
///     timestamp: Utc::now(),
///     params: Params::new(),
///     success: true,
/// };
/// assert_eq!(entry.to, "Processing");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Name of the state being left
    pub from: String,
    /// Name of the state being entered
    pub to: String,
    /// When the transition completed
    pub timestamp: DateTime<Utc>,
    /// Parameters the transition was driven with
    pub params: Params,
    /// Whether the transition completed successfully
    pub success: bool,
}

/// Ordered, bounded history of transitions.
///
/// # Example
///
/// ```rust
/// use statekeeper::core::{HistoryEntry, Params, StateHistory};
/// use chrono::Utc;
///
/// let mut history = StateHistory::with_capacity(2);
/// for (from, to) in [("A", "B"), ("B", "C"), ("C", "D")] {
///     history.record(HistoryEntry {
///         from: from.to_string(),
///         to: to.to_string(),
///         timestamp: Utc::now(),
///         params: Params::new(),
///         success: true,
///     });
/// }
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.get_path(), vec!["B", "C", "D"]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHistory {
    /// Create an empty history with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create an empty history retaining at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
        }
    }

    /// Append an entry, returning the oldest entry if it was evicted.
    pub fn record(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        if self.capacity == 0 {
            return Some(entry);
        }
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Get the path of states traversed.
    ///
    /// Returns the `from` state of the oldest retained entry, then the
    /// `to` state of every entry in order.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.entries.len() + 1);
        if let Some(first) = self.entries.front() {
            path.push(first.from.as_str());
        }
        path.extend(self.entries.iter().map(|entry| entry.to.as_str()));
        path
    }

    /// Duration from the oldest to the newest retained entry.
    ///
    /// Returns `None` if the history is empty.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.entries.front()?, self.entries.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace the retained entries, keeping only the most recent ones that
    /// fit the capacity.
    pub(crate) fn replace(&mut self, entries: impl IntoIterator<Item = HistoryEntry>) {
        self.entries.clear();
        for entry in entries {
            self.record(entry);
        }
    }
}
