//! Core state machine types.
//!
//! This module contains the building blocks the engine is assembled from:
//! - Per-state behavior via the `StateBehavior` trait
//! - Arena-resident state nodes and the hierarchy registry
//! - Guard and action wrappers around effects
//! - Bounded transition history
//!
//! Nothing here drives transitions; that is the job of
//! [`crate::effects::StateMachine`].

mod guard;
mod history;
pub(crate) mod registry;
mod state;

use std::collections::HashMap;

pub use guard::{Action, Guard, HookError, TransitionValidator};
pub use history::{HistoryEntry, StateHistory, DEFAULT_HISTORY_CAPACITY};
pub use registry::StateRegistry;
pub use state::{DefaultBehavior, StateBehavior, StateId, StateMetrics, StateNode};

/// Parameters supplied to a transition and handed to every guard, action
/// and state hook it runs.
pub type Params = HashMap<String, serde_json::Value>;

/// Bound required of the value a machine is driven against.
///
/// The engine never inspects the context; it only lends it to hooks,
/// guards and actions. Wrap shared or mutable data in `Arc` (plus a lock)
/// if hooks need to write through it.
pub trait Context: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Context for T {}
