//! State machine that executes guarded transitions.

use crate::builder::InitError;
use crate::checkpoint::{CheckpointError, Snapshot, SnapshotRecord, SNAPSHOT_VERSION};
use crate::core::registry::name_key;
use crate::core::{
    Context, HistoryEntry, Params, StateHistory, StateId, StateNode, StateRegistry,
};
use crate::effects::events::{MachineEvent, Notifier};
use crate::effects::transition::{Transition, TransitionError, TransitionResult};
use crate::validation::{self, ValidationReport};
use chrono::Utc;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub(crate) struct MachineParts<C: Context> {
    pub machine_id: String,
    pub registry: StateRegistry<C>,
    pub transitions: Vec<Transition<C>>,
    pub initial: StateId,
    pub context: C,
    pub history_capacity: usize,
    pub event_capacity: usize,
}

/// An initialized state machine bound to a context.
///
/// Built by [`crate::builder::MachineBuilder::initialize`]; the topology is
/// fixed from then on. Transition requests take `&mut self`, so a single
/// owner can never interleave two transitions. Use
/// [`crate::effects::SharedMachine`] to drive one machine from several
/// tasks.
pub struct StateMachine<C: Context> {
    machine_id: String,
    registry: StateRegistry<C>,
    transitions: Vec<Transition<C>>,
    endpoints: HashMap<(StateId, StateId), usize>,
    triggers: HashMap<String, Vec<usize>>,
    initial: StateId,
    current: StateId,
    previous: Option<StateId>,
    context: C,
    history: StateHistory,
    notifier: Notifier,
}

impl<C: Context> StateMachine<C> {
    pub(crate) fn assemble(parts: MachineParts<C>) -> Self {
        let mut endpoints = HashMap::new();
        let mut triggers: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, transition) in parts.transitions.iter().enumerate() {
            endpoints.insert((transition.source, transition.target), index);
            if let Some(trigger) = transition.trigger() {
                triggers.entry(name_key(trigger)).or_default().push(index);
            }
        }

        Self {
            machine_id: parts.machine_id,
            registry: parts.registry,
            transitions: parts.transitions,
            endpoints,
            triggers,
            initial: parts.initial,
            current: parts.initial,
            previous: None,
            context: parts.context,
            history: StateHistory::with_capacity(parts.history_capacity),
            notifier: Notifier::new(parts.event_capacity),
        }
    }

    /// Check and enter the initial state.
    pub(crate) async fn enter_initial(&mut self) -> Result<(), InitError> {
        let params = Params::new();
        let initial = self.initial;
        if !self.can_enter_subtree(initial, &params).await {
            let state = self.registry.name(initial).to_string();
            warn!(machine = %self.machine_id, %state, "initial state rejected entry");
            return Err(InitError::EntryRejected { state });
        }
        self.enter_subtree(initial, &params).await;
        info!(
            machine = %self.machine_id,
            state = %self.registry.name(initial),
            "state machine initialized"
        );
        Ok(())
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    pub fn current_state(&self) -> &StateNode<C> {
        self.registry.node(self.current)
    }

    /// `None` until the first transition completes.
    pub fn previous_state(&self) -> Option<&StateNode<C>> {
        self.previous.map(|id| self.registry.node(id))
    }

    pub fn initial_state(&self) -> &StateNode<C> {
        self.registry.node(self.initial)
    }

    /// Look up a registered state by name, ignoring case.
    pub fn state(&self, name: &str) -> Option<&StateNode<C>> {
        self.registry.by_name(name)
    }

    pub fn states(&self) -> &StateRegistry<C> {
        &self.registry
    }

    pub fn transitions(&self) -> &[Transition<C>] {
        &self.transitions
    }

    /// Search the subtree of `root` for a state called `name`.
    pub fn find_descendant(&self, root: &str, name: &str) -> Option<&StateNode<C>> {
        let root = self.registry.lookup(root)?;
        self.registry
            .find_descendant(root, name)
            .map(|id| self.registry.node(id))
    }

    /// True if `other` is `root` or nested somewhere below it.
    pub fn is_in_hierarchy(&self, root: &str, other: &str) -> bool {
        match (self.registry.lookup(root), self.registry.lookup(other)) {
            (Some(root), Some(other)) => self.registry.is_in_hierarchy(root, other),
            _ => false,
        }
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn is_final(&self) -> bool {
        self.current_state().is_final()
    }

    /// Receive change notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MachineEvent> {
        self.notifier.subscribe()
    }

    /// Request a transition from the current state to `state_name`.
    ///
    /// On any failure the current state, previous state and history are
    /// left untouched. Exit and entry checks run before the guard, so a
    /// vetoed exit reports `CannotExit` even when the guard would also fail.
    pub async fn transition_to(&mut self, state_name: &str, params: Params) -> TransitionResult {
        if self.is_final() {
            let state = self.current_state().name().to_string();
            return self.reject(TransitionError::FinalState { state }, None, params);
        }
        let Some(target) = self.registry.lookup(state_name) else {
            let name = state_name.to_string();
            return self.reject(TransitionError::TargetNotFound { name }, None, params);
        };
        let Some(&index) = self.endpoints.get(&(self.current, target)) else {
            let err = TransitionError::NoValidTransition {
                from: self.current_state().name().to_string(),
                to: self.registry.name(target).to_string(),
            };
            return self.reject(err, None, params);
        };
        self.execute_transition(index, params, false).await
    }

    /// Dry run of [`Self::transition_to`]: resolves the transition and
    /// evaluates its guard without changing anything.
    pub async fn can_transition_to(&self, state_name: &str, params: &Params) -> bool {
        if self.is_final() {
            return false;
        }
        let Some(target) = self.registry.lookup(state_name) else {
            return false;
        };
        let Some(&index) = self.endpoints.get(&(self.current, target)) else {
            return false;
        };
        self.transitions[index]
            .can_execute(&self.context, params)
            .await
            .unwrap_or(false)
    }

    /// Dispatch an event. Returns `true` if a transition executed.
    pub async fn fire_event(&mut self, event: &str, params: Params) -> bool {
        self.try_fire_event(event, params).await.is_ok()
    }

    /// Dispatch an event, reporting why nothing happened on failure.
    ///
    /// Candidates are the transitions out of the current state whose
    /// trigger matches `event`, highest priority first and registration
    /// order among equals. The first candidate whose guard passes runs.
    pub async fn try_fire_event(&mut self, event: &str, params: Params) -> TransitionResult {
        if self.is_final() {
            let state = self.current_state().name().to_string();
            return self.reject(TransitionError::FinalState { state }, None, params);
        }

        let candidates = self.candidates(event);
        debug!(
            machine = %self.machine_id,
            event,
            candidates = candidates.len(),
            "resolving event"
        );

        for index in candidates {
            let verdict = self.transitions[index]
                .can_execute(&self.context, &params)
                .await;
            match verdict {
                Ok(true) => return self.execute_transition(index, params, true).await,
                Ok(false) => debug!(
                    transition = %self.transitions[index].name(),
                    "guard rejected candidate"
                ),
                Err(cause) => warn!(
                    transition = %self.transitions[index].name(),
                    error = %cause,
                    "guard faulted, skipping candidate"
                ),
            }
        }

        let err = TransitionError::NoMatchingEvent {
            event: event.to_string(),
            state: self.current_state().name().to_string(),
        };
        self.reject(err, None, params)
    }

    fn candidates(&self, event: &str) -> Vec<usize> {
        let mut candidates: Vec<usize> = self
            .triggers
            .get(&name_key(event))
            .map(|indices| {
                indices
                    .iter()
                    .copied()
                    .filter(|index| self.transitions[*index].source == self.current)
                    .collect()
            })
            .unwrap_or_default();
        // stable: equal priorities keep registration order
        candidates.sort_by_key(|index| Reverse(self.transitions[*index].priority));
        candidates
    }

    /// Run `on_execute` across the current state and its active children.
    pub async fn execute_current(&self) {
        for id in self.registry.active_order(self.current) {
            self.registry
                .node(id)
                .behavior
                .on_execute(&self.context)
                .await;
        }
    }

    async fn execute_transition(
        &mut self,
        index: usize,
        params: Params,
        guard_checked: bool,
    ) -> TransitionResult {
        let transition = self.transitions[index].clone();
        let span = info_span!(
            "transition",
            machine = %self.machine_id,
            transition = %transition.name,
            from = %self.registry.name(transition.source),
            to = %self.registry.name(transition.target),
        );
        self.run_protocol(transition, params, guard_checked)
            .instrument(span)
            .await
    }

    async fn run_protocol(
        &mut self,
        transition: Transition<C>,
        params: Params,
        guard_checked: bool,
    ) -> TransitionResult {
        let (source, target) = (transition.source, transition.target);
        let from = self.registry.name(source).to_string();
        let to = self.registry.name(target).to_string();
        let name = transition.name.as_str();

        if !self.can_exit_subtree(source, &params).await {
            return self.reject(TransitionError::CannotExit { state: from }, Some(name), params);
        }
        if !self.can_enter_subtree(target, &params).await {
            return self.reject(TransitionError::CannotEnter { state: to }, Some(name), params);
        }
        if !guard_checked {
            match transition.can_execute(&self.context, &params).await {
                Ok(true) => {}
                Ok(false) => {
                    let err = TransitionError::GuardRejected {
                        transition: name.to_string(),
                        cause: None,
                    };
                    return self.reject(err, Some(name), params);
                }
                Err(cause) => {
                    let err = TransitionError::GuardRejected {
                        transition: name.to_string(),
                        cause: Some(cause),
                    };
                    return self.reject(err, Some(name), params);
                }
            }
        }

        self.notifier.emit(MachineEvent::TransitionExecuting {
            transition: name.to_string(),
            from: from.clone(),
            to: to.clone(),
            params: params.clone(),
            timestamp: Utc::now(),
        });
        if let Err(cause) = transition.execute(&self.context, &params).await {
            error!(error = %cause, "transition action failed");
            let err = TransitionError::ActionFailed {
                transition: name.to_string(),
                source: cause,
            };
            return self.reject(err, Some(name), params);
        }

        // Past this point nothing can fail.
        self.notifier.emit(MachineEvent::StateChanging {
            from: from.clone(),
            to: to.clone(),
            params: params.clone(),
            timestamp: Utc::now(),
        });
        self.exit_subtree(source, &params).await;

        let entry = HistoryEntry {
            from: from.clone(),
            to: to.clone(),
            timestamp: Utc::now(),
            params: params.clone(),
            success: true,
        };
        if let Some(evicted) = self.history.record(entry.clone()) {
            debug!(from = %evicted.from, to = %evicted.to, "history full, evicted oldest entry");
        }

        self.previous = Some(source);
        self.current = target;
        self.enter_subtree(target, &params).await;

        let timestamp = Utc::now();
        self.notifier.emit(MachineEvent::StateChanged {
            from: from.clone(),
            to: to.clone(),
            params: params.clone(),
            timestamp,
        });
        self.notifier.emit(MachineEvent::TransitionExecuted {
            transition: name.to_string(),
            from,
            to,
            params,
            timestamp,
        });
        info!("transition completed");
        Ok(entry)
    }

    fn reject(
        &self,
        error: TransitionError,
        transition: Option<&str>,
        params: Params,
    ) -> TransitionResult {
        warn!(
            machine = %self.machine_id,
            state = %self.current_state().name(),
            error = %error,
            "transition rejected"
        );
        self.notifier.emit(MachineEvent::ErrorOccurred {
            transition: transition.map(str::to_string),
            state: self.current_state().name().to_string(),
            message: error.to_string(),
            params,
            timestamp: Utc::now(),
        });
        Err(error)
    }

    async fn can_enter_subtree(&self, root: StateId, params: &Params) -> bool {
        for id in self.registry.entry_check_order(root) {
            let node = self.registry.node(id);
            if !node.behavior.can_enter(&self.context, params).await {
                debug!(state = %node.name, "state rejected entry");
                return false;
            }
        }
        true
    }

    async fn can_exit_subtree(&self, root: StateId, params: &Params) -> bool {
        for id in self.registry.exit_order(root) {
            let node = self.registry.node(id);
            if !node.behavior.can_exit(&self.context, params).await {
                debug!(state = %node.name, "state rejected exit");
                return false;
            }
        }
        true
    }

    async fn enter_subtree(&mut self, root: StateId, params: &Params) {
        let now = Utc::now();
        for id in self.registry.entry_order(root) {
            let node = self.registry.node_mut(id);
            node.active = true;
            node.metrics.record_entry(now);
            let behavior = Arc::clone(&node.behavior);
            behavior.on_enter(&self.context, params).await;
        }
    }

    async fn exit_subtree(&mut self, root: StateId, params: &Params) {
        let now = Utc::now();
        for id in self.registry.exit_order(root) {
            let node = self.registry.node_mut(id);
            node.active = false;
            node.metrics.record_exit(now);
            let behavior = Arc::clone(&node.behavior);
            behavior.on_exit(&self.context, params).await;
        }
    }

    /// Restore current state, previous state and history from a snapshot.
    ///
    /// State names are resolved against this machine's registry. An
    /// unsupported version or an unknown state name fails the restore and
    /// leaves the machine unchanged. Entry and exit hooks are not run, but
    /// the restored state and its initial children are marked active.
    pub fn restore_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), CheckpointError> {
        snapshot.check_version()?;
        let resolve = |name: &str| {
            self.registry
                .lookup(name)
                .ok_or_else(|| CheckpointError::UnknownState(name.to_string()))
        };
        let current = resolve(snapshot.current_state_name.as_str())?;
        let previous = snapshot
            .previous_state_name
            .as_deref()
            .map(resolve)
            .transpose()?;

        let all: Vec<StateId> = self.registry.iter().map(|node| node.id()).collect();
        for id in all {
            self.registry.node_mut(id).active = false;
        }
        // same active set a live transition into `current` leaves behind
        for id in self.registry.entry_order(current) {
            self.registry.node_mut(id).active = true;
        }
        self.current = current;
        self.previous = previous;
        self.history
            .replace(snapshot.history.iter().cloned().map(HistoryEntry::from));

        info!(
            machine = %self.machine_id,
            snapshot = %snapshot.machine_id,
            state = %snapshot.current_state_name,
            "restored from snapshot"
        );
        Ok(())
    }

    /// Structural validation: reachability, dead ends and per-transition
    /// checks.
    pub fn validate(&self) -> ValidationReport {
        let report =
            validation::validate(&self.registry, &self.transitions, self.initial, &self.context);
        for finding in &report.warnings {
            warn!(machine = %self.machine_id, %finding, "validation warning");
        }
        for finding in &report.errors {
            error!(machine = %self.machine_id, %finding, "validation error");
        }
        report
    }
}

impl<C: Context + Serialize> StateMachine<C> {
    /// Capture current state, previous state, history and context.
    pub fn create_snapshot(&self) -> Result<Snapshot, CheckpointError> {
        let context_data = serde_json::to_value(&self.context)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))?;
        Ok(Snapshot {
            machine_id: self.machine_id.clone(),
            current_state_name: self.current_state().name().to_string(),
            previous_state_name: self.previous_state().map(|s| s.name().to_string()),
            snapshot_time: Utc::now(),
            context_data,
            history: self.history.entries().map(SnapshotRecord::from).collect(),
            version: SNAPSHOT_VERSION.to_string(),
        })
    }
}
