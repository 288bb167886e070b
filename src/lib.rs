//! Statekeeper: a hierarchical, asynchronous state machine engine
//!
//! Statekeeper follows Stillwater's "pure core, imperative shell" split. The
//! core holds the state arena, hierarchy queries and bounded history; the
//! shell runs guards, actions and state hooks as effects against a
//! host-supplied context and publishes change notifications.
//!
//! # Core Concepts
//!
//! - **States**: named, optionally nested, with async entry/exit/execute
//!   hooks via the `StateBehavior` trait
//! - **Transitions**: guarded edges, requested by target name or fired by
//!   event with priority ordering
//! - **History**: bounded record of completed transitions
//! - **Snapshots**: serializable capture for persistence and restore
//!
//! # Example
//!
//! ```rust
//! use statekeeper::builder::{MachineBuilder, StateBuilder, TransitionBuilder};
//! use statekeeper::core::Params;
//!
//! # tokio_test_block(async {
//! let mut machine = MachineBuilder::new()
//!     .add_state(StateBuilder::new("Initial").initial())
//!     .unwrap()
//!     .add_state(StateBuilder::new("Processing"))
//!     .unwrap()
//!     .add_state(StateBuilder::new("Complete").final_state())
//!     .unwrap()
//!     .transition(TransitionBuilder::new().from("Initial").to("Processing").on("start"))
//!     .unwrap()
//!     .transition(TransitionBuilder::new().from("Processing").to("Complete").on("finish"))
//!     .unwrap()
//!     .initialize((), None)
//!     .await
//!     .unwrap();
//!
//! assert!(machine.fire_event("start", Params::new()).await);
//! machine.transition_to("Complete", Params::new()).await.unwrap();
//! assert!(machine.is_final());
//! assert_eq!(machine.history().get_path(), vec!["Initial", "Processing", "Complete"]);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod effects;
pub mod validation;

// Re-export commonly used types
pub use builder::{BuildError, InitError, MachineBuilder, StateBuilder, TransitionBuilder};
pub use checkpoint::{CheckpointError, Snapshot};
pub use config::MachineConfig;
pub use crate::core::{
    Action, Context, Guard, HistoryEntry, HookError, Params, StateBehavior, StateHistory,
    StateNode,
};
pub use effects::{
    MachineEvent, SharedMachine, StateMachine, Transition, TransitionError, TransitionResult,
};
pub use validation::{ValidationFinding, ValidationReport};

pub use async_trait::async_trait;

#[doc(hidden)]
pub use serde_json as __serde_json;
