//! Builder API for ergonomic state machine construction.
//!
//! This module provides fluent builders and macros for describing states,
//! their hierarchy and the transitions between them, then compiling the
//! description into a running [`crate::effects::StateMachine`].

pub mod error;
pub mod machine;
pub mod macros;
pub mod state;
pub mod transition;

pub use error::{BuildError, InitError};
pub use machine::MachineBuilder;
pub use state::StateBuilder;
pub use transition::{TransitionBuilder, TransitionDefinition};

use crate::core::{Context, Params};

/// Create an unconditional transition between two named states.
///
/// # Example
///
/// ```
/// use statekeeper::builder::{simple_transition, MachineBuilder, StateBuilder};
///
/// let builder = MachineBuilder::<()>::new()
///     .add_state(StateBuilder::new("Start"))
///     .unwrap()
///     .add_state(StateBuilder::new("End"))
///     .unwrap()
///     .transition(simple_transition("Start", "End"))
///     .unwrap();
/// assert_eq!(builder.transition_count(), 1);
/// ```
pub fn simple_transition<C: Context>(
    from: impl Into<String>,
    to: impl Into<String>,
) -> TransitionBuilder<C> {
    TransitionBuilder::new().from(from).to(to)
}

/// Create a transition with a guard predicate.
///
/// # Example
///
/// ```
/// use statekeeper::builder::guarded_transition;
/// use statekeeper::core::Params;
///
/// let transition = guarded_transition("Start", "Middle", |limit: &u32, params: &Params| {
///     params.get("amount").and_then(|v| v.as_u64()).unwrap_or(0) <= u64::from(*limit)
/// })
/// .build()
/// .unwrap();
/// assert_eq!(transition.name(), "Start->Middle");
/// ```
pub fn guarded_transition<C, F>(
    from: impl Into<String>,
    to: impl Into<String>,
    guard: F,
) -> TransitionBuilder<C>
where
    C: Context,
    F: Fn(&C, &Params) -> bool + Send + Sync + 'static,
{
    simple_transition(from, to).when(guard)
}

/// Create a transition fired by `event`.
pub fn event_transition<C: Context>(
    event: impl Into<String>,
    from: impl Into<String>,
    to: impl Into<String>,
) -> TransitionBuilder<C> {
    simple_transition(from, to).on(event)
}
