//! Effectful state machine operations using Stillwater 0.11.0.
//!
//! This module is the "imperative shell" around the pure core: it runs
//! guards, actions and state hooks, records history and publishes change
//! notifications.
//!
//! # Key Concepts
//!
//! - **Transitions**: directed edges with an optional trigger, priority,
//!   guard and action
//! - **State Machine**: executes the transition protocol and tracks history
//! - **Events**: broadcast notifications for hosts to react to
//!
//! Guards and actions are stored as `BoxedEffect` factories (one allocation
//! per evaluation) and run against the machine's context.

mod events;
pub(crate) mod machine;
mod shared;
mod transition;

pub use events::{MachineEvent, DEFAULT_EVENT_CAPACITY};
pub use machine::StateMachine;
pub use shared::SharedMachine;
pub use transition::{Transition, TransitionError, TransitionResult};
