//! State nodes and per-state behavior.
//!
//! States live in a flat arena owned by the machine. A node refers to its
//! parent and children by [`StateId`], so the hierarchy carries no
//! back-pointers and no reference cycles.

use super::{Context, Params};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Hooks run by the engine while a state is entered, occupied and exited.
///
/// Every hook has a default, so implementors override only what they need.
/// Composite handling (initial children on entry, active children on exit)
/// is applied by the engine around these hooks.
///
/// # Example
///
/// ```rust
/// use statekeeper::core::{Params, StateBehavior};
/// use async_trait::async_trait;
///
/// #[derive(Clone)]
/// struct Ledger {
///     open: bool,
/// }
///
/// struct Processing;
///
/// #[async_trait]
/// impl StateBehavior<Ledger> for Processing {
///     async fn can_enter(&self, ledger: &Ledger, _params: &Params) -> bool {
///         ledger.open
///     }
/// }
/// ```
#[async_trait]
pub trait StateBehavior<C: Context>: Send + Sync {
    /// Whether this state accepts entry. Defaults to `true`.
    async fn can_enter(&self, _context: &C, _params: &Params) -> bool {
        true
    }

    /// Whether this state may be left. Defaults to `true`.
    async fn can_exit(&self, _context: &C, _params: &Params) -> bool {
        true
    }

    /// Runs after the entry has been recorded.
    async fn on_enter(&self, _context: &C, _params: &Params) {}

    /// Runs after the exit has been recorded.
    async fn on_exit(&self, _context: &C, _params: &Params) {}

    /// Steady-state work while the state is active. Only invoked when the
    /// host calls [`crate::effects::StateMachine::execute_current`].
    async fn on_execute(&self, _context: &C) {}
}

/// Behavior with every hook left at its default.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultBehavior;

#[async_trait]
impl<C: Context> StateBehavior<C> for DefaultBehavior {}

/// Index of a state inside its machine's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Usage metadata, mutated only by the engine during transitions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateMetrics {
    /// How many times the state has been entered
    pub enter_count: u64,
    /// When the state was last entered
    pub last_entered: Option<DateTime<Utc>>,
    /// When the state was last exited
    pub last_exited: Option<DateTime<Utc>>,
    /// Total time spent in the state across completed visits
    pub total_dwell: Duration,
}

impl StateMetrics {
    pub(crate) fn record_entry(&mut self, now: DateTime<Utc>) {
        self.enter_count += 1;
        self.last_entered = Some(now);
    }

    pub(crate) fn record_exit(&mut self, now: DateTime<Utc>) {
        self.last_exited = Some(now);
        if let Some(entered) = self.last_entered {
            let visit = now
                .signed_duration_since(entered)
                .to_std()
                .unwrap_or(Duration::ZERO);
            self.total_dwell += visit;
        }
    }

    /// Time spent in the current visit, if the state was entered after it
    /// was last exited.
    pub fn current_dwell(&self, now: DateTime<Utc>) -> Option<Duration> {
        let entered = self.last_entered?;
        if matches!(self.last_exited, Some(exited) if exited >= entered) {
            return None;
        }
        now.signed_duration_since(entered).to_std().ok()
    }
}

/// A named node in the machine.
pub struct StateNode<C: Context> {
    pub(crate) id: StateId,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) is_initial: bool,
    pub(crate) is_final: bool,
    pub(crate) parent: Option<StateId>,
    pub(crate) children: Vec<StateId>,
    pub(crate) level: usize,
    pub(crate) active: bool,
    pub(crate) metrics: StateMetrics,
    pub(crate) behavior: Arc<dyn StateBehavior<C>>,
}

impl<C: Context> StateNode<C> {
    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_initial(&self) -> bool {
        self.is_initial
    }

    /// Final states accept no further transitions.
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    /// Child states in attach order.
    pub fn children(&self) -> &[StateId] {
        &self.children
    }

    pub fn is_composite(&self) -> bool {
        !self.children.is_empty()
    }

    /// Depth in the hierarchy; top-level states are at level 0.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Whether the state is currently entered.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn metrics(&self) -> &StateMetrics {
        &self.metrics
    }
}

impl<C: Context> fmt::Debug for StateNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("is_initial", &self.is_initial)
            .field("is_final", &self.is_final)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("level", &self.level)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn entry_increments_count_and_stamps_time() {
        let mut metrics = StateMetrics::default();
        let now = Utc::now();

        metrics.record_entry(now);
        metrics.record_entry(now);

        assert_eq!(metrics.enter_count, 2);
        assert_eq!(metrics.last_entered, Some(now));
    }

    #[test]
    fn exit_accumulates_dwell_time() {
        let mut metrics = StateMetrics::default();
        let start = Utc::now();

        metrics.record_entry(start);
        metrics.record_exit(start + ChronoDuration::seconds(3));
        metrics.record_entry(start + ChronoDuration::seconds(10));
        metrics.record_exit(start + ChronoDuration::seconds(12));

        assert_eq!(metrics.total_dwell, Duration::from_secs(5));
        assert_eq!(
            metrics.last_exited,
            Some(start + ChronoDuration::seconds(12))
        );
    }

    #[test]
    fn exit_without_entry_adds_no_dwell() {
        let mut metrics = StateMetrics::default();

        metrics.record_exit(Utc::now());

        assert_eq!(metrics.total_dwell, Duration::ZERO);
        assert!(metrics.last_exited.is_some());
    }

    #[test]
    fn current_dwell_only_while_inside() {
        let mut metrics = StateMetrics::default();
        let start = Utc::now();
        assert!(metrics.current_dwell(start).is_none());

        metrics.record_entry(start);
        assert_eq!(
            metrics.current_dwell(start + ChronoDuration::seconds(4)),
            Some(Duration::from_secs(4))
        );

        metrics.record_exit(start + ChronoDuration::seconds(5));
        assert!(metrics
            .current_dwell(start + ChronoDuration::seconds(6))
            .is_none());
    }

    #[tokio::test]
    async fn default_behavior_allows_everything() {
        let behavior = DefaultBehavior;
        let params = Params::new();

        assert!(StateBehavior::<u32>::can_enter(&behavior, &7, &params).await);
        assert!(StateBehavior::<u32>::can_exit(&behavior, &7, &params).await);
    }
}
