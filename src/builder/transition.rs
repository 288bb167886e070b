//! Builder for constructing state transitions.

use crate::builder::error::BuildError;
use crate::core::registry::name_key;
use crate::core::{Action, Context, Guard, HookError, Params, TransitionValidator};
use std::fmt;
use std::sync::Arc;

/// A transition described by state names, not yet bound to a machine.
pub struct TransitionDefinition<C: Context> {
    pub(crate) name: String,
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) trigger: Option<String>,
    pub(crate) priority: i32,
    pub(crate) guard: Option<Guard<C>>,
    pub(crate) action: Option<Action<C>>,
    pub(crate) validator: Option<TransitionValidator<C>>,
}

impl<C: Context> TransitionDefinition<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn trigger(&self) -> Option<&str> {
        self.trigger.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }
}

impl<C: Context> fmt::Debug for TransitionDefinition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionDefinition")
            .field("name", &self.name)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("trigger", &self.trigger)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing transitions with a fluent API.
pub struct TransitionBuilder<C: Context> {
    name: Option<String>,
    from: Option<String>,
    to: Option<String>,
    trigger: Option<String>,
    priority: i32,
    guard: Option<Guard<C>>,
    action: Option<Action<C>>,
    validator: Option<TransitionValidator<C>>,
}

impl<C: Context> TransitionBuilder<C> {
    /// Create a new transition builder.
    pub fn new() -> Self {
        Self {
            name: None,
            from: None,
            to: None,
            trigger: None,
            priority: 0,
            guard: None,
            action: None,
            validator: None,
        }
    }

    /// Name the transition. Defaults to `"{from}->{to}"`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the source state (required).
    pub fn from(mut self, state: impl Into<String>) -> Self {
        self.from = Some(state.into());
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to = Some(state.into());
        self
    }

    /// Event that fires this transition.
    pub fn on(mut self, event: impl Into<String>) -> Self {
        self.trigger = Some(event.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a guard (optional).
    pub fn guard(mut self, guard: Guard<C>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure (optional).
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&C, &Params) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Set the action run before the state change (optional).
    pub fn action(mut self, action: Action<C>) -> Self {
        self.action = Some(action);
        self
    }

    /// Set the action using a closure (optional).
    pub fn perform<F>(mut self, action: F) -> Self
    where
        F: Fn(&C, &Params) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.action = Some(Action::new(action));
        self
    }

    /// Structural check consulted by machine validation.
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&C) -> Result<bool, HookError> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Build the transition.
    pub fn build(self) -> Result<TransitionDefinition<C>, BuildError> {
        let from = self.from.ok_or(BuildError::MissingFromState)?;
        let to = self.to.ok_or(BuildError::MissingToState)?;
        let name = self.name.unwrap_or_else(|| format!("{from}->{to}"));

        if name_key(&from) == name_key(&to) {
            return Err(BuildError::SelfLoop { name, state: from });
        }

        Ok(TransitionDefinition {
            name,
            from,
            to,
            trigger: self.trigger,
            priority: self.priority,
            guard: self.guard,
            action: self.action,
            validator: self.validator,
        })
    }
}

impl<C: Context> Default for TransitionBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
