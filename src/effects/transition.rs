//! State transition types with effectful guards and actions.

use crate::core::{
    Action, Context, Guard, HistoryEntry, HookError, Params, StateId, TransitionValidator,
};
use crate::core::registry::name_key;
use std::fmt;
use thiserror::Error;

/// Outcome of a transition request: the recorded history entry on success.
pub type TransitionResult = Result<HistoryEntry, TransitionError>;

/// Errors that can occur during transitions.
///
/// All of these are recoverable: the machine is left exactly as it was
/// before the request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("Cannot transition from final state '{state}'")]
    FinalState { state: String },

    #[error("Target state '{name}' not found")]
    TargetNotFound { name: String },

    #[error("No valid transition from '{from}' to '{to}'")]
    NoValidTransition { from: String, to: String },

    #[error("No enabled transition for event '{event}' in state '{state}'")]
    NoMatchingEvent { event: String, state: String },

    #[error("Guard rejected transition '{transition}'")]
    GuardRejected {
        transition: String,
        cause: Option<HookError>,
    },

    #[error("Cannot exit current state '{state}'")]
    CannotExit { state: String },

    #[error("Cannot enter target state '{state}'")]
    CannotEnter { state: String },

    #[error("Transition action '{transition}' failed: {source}")]
    ActionFailed {
        transition: String,
        #[source]
        source: HookError,
    },
}

impl TransitionError {
    /// Hook failure behind this error, if any.
    pub fn cause(&self) -> Option<&HookError> {
        match self {
            Self::GuardRejected { cause, .. } => cause.as_ref(),
            Self::ActionFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A directed edge between two registered states.
pub struct Transition<C: Context> {
    pub(crate) name: String,
    pub(crate) trigger: Option<String>,
    pub(crate) priority: i32,
    pub(crate) source: StateId,
    pub(crate) target: StateId,
    pub(crate) guard: Option<Guard<C>>,
    pub(crate) action: Option<Action<C>>,
    pub(crate) validator: Option<TransitionValidator<C>>,
}

impl<C: Context> Transition<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger(&self) -> Option<&str> {
        self.trigger.as_deref()
    }

    /// Higher priorities win when several transitions share a trigger.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn source(&self) -> StateId {
        self.source
    }

    pub fn target(&self) -> StateId {
        self.target
    }

    /// Case-insensitive trigger comparison.
    pub fn matches_trigger(&self, event: &str) -> bool {
        self.trigger
            .as_deref()
            .is_some_and(|trigger| name_key(trigger) == name_key(event))
    }

    /// Evaluate the guard. A transition without a guard may always execute.
    pub async fn can_execute(&self, context: &C, params: &Params) -> Result<bool, HookError> {
        match &self.guard {
            Some(guard) => guard.check(context, params).await,
            None => Ok(true),
        }
    }

    /// Run the action, if any. Failures are returned verbatim.
    pub async fn execute(&self, context: &C, params: &Params) -> Result<(), HookError> {
        match &self.action {
            Some(action) => action.run(context, params).await,
            None => Ok(()),
        }
    }

    /// Structural sanity check used by the validator, never by the
    /// transition hot path.
    pub fn validate(&self, context: &C) -> Result<bool, HookError> {
        if self.source == self.target {
            return Ok(false);
        }
        match &self.validator {
            Some(validator) => validator(context),
            None => Ok(true),
        }
    }
}

impl<C: Context> Clone for Transition<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            trigger: self.trigger.clone(),
            priority: self.priority,
            source: self.source,
            target: self.target,
            guard: self.guard.clone(),
            action: self.action.clone(),
            validator: self.validator.clone(),
        }
    }
}

impl<C: Context> fmt::Debug for Transition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("priority", &self.priority)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("guarded", &self.guard.is_some())
            .finish_non_exhaustive()
    }
}
