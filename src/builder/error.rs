//! Configuration and initialization errors.

use thiserror::Error;

/// Errors raised while configuring states and transitions.
///
/// Each is reported by the call that introduced the problem; nothing is
/// silently overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("State name must not be empty")]
    EmptyStateName,

    #[error("State '{name}' is already registered")]
    DuplicateState { name: String },

    #[error("State '{name}' is not registered")]
    UnknownState { name: String },

    #[error("State '{parent}' already has a child named '{child}'")]
    DuplicateChild { parent: String, child: String },

    #[error("State '{child}' is already attached to '{parent}'")]
    AlreadyAttached { child: String, parent: String },

    #[error("Attaching '{child}' under '{parent}' would make '{child}' its own ancestor")]
    CyclicHierarchy { parent: String, child: String },

    #[error("Transition source state not specified. Call .from(state)")]
    MissingFromState,

    #[error("Transition target state not specified. Call .to(state)")]
    MissingToState,

    #[error("Transition '{name}' is already registered")]
    DuplicateTransition { name: String },

    #[error("A transition from '{from}' to '{to}' is already registered")]
    DuplicateEndpoints { from: String, to: String },

    #[error("Transition '{name}' loops on '{state}'; source and target must differ")]
    SelfLoop { name: String, state: String },
}

/// Reasons [`crate::builder::MachineBuilder::initialize`] can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("No states registered")]
    NoStates,

    #[error("Initial state '{name}' is not registered")]
    UnknownInitialState { name: String },

    #[error("Initial state '{state}' rejected entry")]
    EntryRejected { state: String },
}
