//! Builder for constructing state machines.
//!
//! States and transitions are registered by name. `initialize` compiles the
//! definitions into an id-linked [`StateMachine`] and enters the initial
//! state; after that the topology is fixed.

use crate::builder::error::{BuildError, InitError};
use crate::builder::state::StateBuilder;
use crate::builder::transition::{TransitionBuilder, TransitionDefinition};
use crate::checkpoint::{CheckpointError, Snapshot};
use crate::config::MachineConfig;
use crate::core::registry::name_key;
use crate::core::{Context, StateId, StateMetrics, StateNode, StateRegistry};
use crate::effects::machine::MachineParts;
use crate::effects::{StateMachine, Transition};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

struct PendingState<C: Context> {
    key: String,
    state: StateBuilder<C>,
    parent: Option<String>,
    children: Vec<String>,
}

/// Builder for constructing state machines with a fluent API.
pub struct MachineBuilder<C: Context> {
    config: MachineConfig,
    states: Vec<PendingState<C>>,
    transitions: Vec<TransitionDefinition<C>>,
}

impl<C: Context> MachineBuilder<C> {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        Self {
            config,
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn machine_id(mut self, machine_id: impl Into<String>) -> Self {
        self.config.machine_id = machine_id.into();
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    fn position(&self, name: &str) -> Option<usize> {
        let key = name_key(name);
        self.states.iter().position(|pending| pending.key == key)
    }

    fn require(&self, name: &str) -> Result<usize, BuildError> {
        self.position(name).ok_or_else(|| BuildError::UnknownState {
            name: name.to_string(),
        })
    }

    /// Register a top-level state. Names are unique, ignoring case.
    pub fn add_state(mut self, state: StateBuilder<C>) -> Result<Self, BuildError> {
        if state.name.trim().is_empty() {
            return Err(BuildError::EmptyStateName);
        }
        if self.has_state(&state.name) {
            return Err(BuildError::DuplicateState { name: state.name });
        }
        debug!(state = %state.name, "registered state");
        self.states.push(PendingState {
            key: name_key(&state.name),
            state,
            parent: None,
            children: Vec::new(),
        });
        Ok(self)
    }

    /// Register a state nested under an existing one.
    pub fn add_child_state(self, parent: &str, state: StateBuilder<C>) -> Result<Self, BuildError> {
        self.require(parent)?;
        let child = state.name.clone();
        self.add_state(state)?.attach_child(parent, &child)
    }

    /// Nest an already registered state under `parent`.
    pub fn attach_child(mut self, parent: &str, child: &str) -> Result<Self, BuildError> {
        let parent_index = self.require(parent)?;
        let child_index = self.require(child)?;
        let parent_name = self.states[parent_index].state.name.clone();
        let child_name = self.states[child_index].state.name.clone();

        if let Some(existing) = self.states[child_index].parent.clone() {
            return Err(if name_key(&existing) == name_key(&parent_name) {
                BuildError::DuplicateChild {
                    parent: existing,
                    child: child_name,
                }
            } else {
                BuildError::AlreadyAttached {
                    child: child_name,
                    parent: existing,
                }
            });
        }

        // the child must not be the parent or one of its ancestors
        let mut cursor = Some(parent_index);
        while let Some(index) = cursor {
            if index == child_index {
                return Err(BuildError::CyclicHierarchy {
                    parent: parent_name,
                    child: child_name,
                });
            }
            cursor = self.states[index]
                .parent
                .as_deref()
                .and_then(|name| self.position(name));
        }

        debug!(parent = %parent_name, child = %child_name, "attached child state");
        self.states[child_index].parent = Some(parent_name);
        self.states[parent_index].children.push(child_name);
        Ok(self)
    }

    /// Remove a state, its descendants and every transition touching them.
    pub fn remove_state(mut self, name: &str) -> Result<Self, BuildError> {
        let index = self.require(name)?;

        let mut removed = HashSet::new();
        let mut stack = vec![self.states[index].key.clone()];
        while let Some(key) = stack.pop() {
            if let Some(position) = self.position(&key) {
                stack.extend(self.states[position].children.iter().map(|c| name_key(c)));
            }
            removed.insert(key);
        }

        if let Some(parent) = self.states[index].parent.clone() {
            if let Some(position) = self.position(&parent) {
                let key = name_key(name);
                self.states[position]
                    .children
                    .retain(|child| name_key(child) != key);
            }
        }

        self.states.retain(|pending| !removed.contains(&pending.key));
        let before = self.transitions.len();
        self.transitions.retain(|t| {
            !removed.contains(&name_key(&t.from)) && !removed.contains(&name_key(&t.to))
        });

        debug!(
            state = name,
            states = removed.len(),
            transitions = before - self.transitions.len(),
            "removed state"
        );
        Ok(self)
    }

    /// Add a transition using a builder.
    /// Returns an error if the builder fails validation.
    pub fn transition(self, builder: TransitionBuilder<C>) -> Result<Self, BuildError> {
        let transition = builder.build()?;
        self.add_transition(transition)
    }

    /// Add a pre-built transition.
    ///
    /// Both endpoints must be registered. Transition names are unique and
    /// so is each (source, target) pair.
    pub fn add_transition(mut self, transition: TransitionDefinition<C>) -> Result<Self, BuildError> {
        self.require(&transition.from)?;
        self.require(&transition.to)?;

        let key = name_key(&transition.name);
        if self.transitions.iter().any(|t| name_key(&t.name) == key) {
            return Err(BuildError::DuplicateTransition {
                name: transition.name,
            });
        }
        let endpoints = (name_key(&transition.from), name_key(&transition.to));
        if self
            .transitions
            .iter()
            .any(|t| (name_key(&t.from), name_key(&t.to)) == endpoints)
        {
            return Err(BuildError::DuplicateEndpoints {
                from: transition.from,
                to: transition.to,
            });
        }

        debug!(transition = %transition.name, from = %transition.from, to = %transition.to, "registered transition");
        self.transitions.push(transition);
        Ok(self)
    }

    /// Compile the definitions and enter the initial state.
    ///
    /// Without an explicit name the initial state is the first top-level
    /// state marked initial, falling back to the first top-level state
    /// registered.
    pub async fn initialize(
        self,
        context: C,
        initial_state: Option<&str>,
    ) -> Result<StateMachine<C>, InitError> {
        if self.states.is_empty() {
            return Err(InitError::NoStates);
        }
        let initial = match initial_state {
            Some(name) => self
                .position(name)
                .ok_or_else(|| InitError::UnknownInitialState {
                    name: name.to_string(),
                })?,
            None => self.flagged_initial().unwrap_or_else(|| {
                let index = self.first_top_level();
                warn!(
                    state = %self.states[index].state.name,
                    "no initial state marked, using first registered"
                );
                index
            }),
        };

        let mut machine = StateMachine::assemble(self.compile(context, initial));
        machine.enter_initial().await?;
        Ok(machine)
    }

    /// Compile the definitions and restore a snapshot into them.
    ///
    /// No entry hooks run: the snapshot describes a machine that already
    /// entered its current state.
    pub fn resume(self, context: C, snapshot: &Snapshot) -> Result<StateMachine<C>, CheckpointError> {
        snapshot.check_version()?;
        if self.states.is_empty() {
            return Err(CheckpointError::UnknownState(
                snapshot.current_state_name.clone(),
            ));
        }
        let initial = self
            .flagged_initial()
            .unwrap_or_else(|| self.first_top_level());

        let mut machine = StateMachine::assemble(self.compile(context, initial));
        machine.restore_from_snapshot(snapshot)?;
        Ok(machine)
    }

    fn flagged_initial(&self) -> Option<usize> {
        self.states
            .iter()
            .position(|pending| pending.parent.is_none() && pending.state.is_initial)
    }

    fn first_top_level(&self) -> usize {
        self.states
            .iter()
            .position(|pending| pending.parent.is_none())
            .unwrap_or(0)
    }

    fn compile(self, context: C, initial: usize) -> MachineParts<C> {
        let ids: HashMap<String, StateId> = self
            .states
            .iter()
            .enumerate()
            .map(|(index, pending)| (pending.key.clone(), StateId(index)))
            .collect();
        // every name was resolved when it was registered
        let id_of = |name: &str| ids[&name_key(name)];

        let levels: Vec<usize> = self
            .states
            .iter()
            .map(|pending| {
                let mut level = 0;
                let mut cursor = pending.parent.as_deref();
                while let Some(parent) = cursor {
                    level += 1;
                    cursor = self.states[id_of(parent).index()].parent.as_deref();
                }
                level
            })
            .collect();

        let nodes: Vec<StateNode<C>> = self
            .states
            .into_iter()
            .zip(levels)
            .enumerate()
            .map(|(index, (pending, level))| StateNode {
                id: StateId(index),
                parent: pending.parent.as_deref().map(id_of),
                children: pending
                    .children
                    .iter()
                    .map(|child| id_of(child.as_str()))
                    .collect(),
                level,
                name: pending.state.name,
                description: pending.state.description,
                is_initial: pending.state.is_initial,
                is_final: pending.state.is_final,
                active: false,
                metrics: StateMetrics::default(),
                behavior: pending.state.behavior,
            })
            .collect();

        let transitions: Vec<Transition<C>> = self
            .transitions
            .into_iter()
            .map(|definition| Transition {
                source: id_of(definition.from.as_str()),
                target: id_of(definition.to.as_str()),
                name: definition.name,
                trigger: definition.trigger,
                priority: definition.priority,
                guard: definition.guard,
                action: definition.action,
                validator: definition.validator,
            })
            .collect();

        info!(
            machine = %self.config.machine_id,
            states = nodes.len(),
            transitions = transitions.len(),
            "compiled state machine"
        );

        MachineParts {
            machine_id: self.config.machine_id,
            registry: StateRegistry::from_nodes(nodes),
            transitions,
            initial: StateId(initial),
            context,
            history_capacity: self.config.history_capacity,
            event_capacity: self.config.event_capacity,
        }
    }
}

impl<C: Context> Default for MachineBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
