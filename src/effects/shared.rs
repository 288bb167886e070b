//! A state machine shared between tasks.

use crate::checkpoint::{CheckpointError, Snapshot};
use crate::core::{Context, Params};
use crate::effects::events::MachineEvent;
use crate::effects::machine::StateMachine;
use crate::effects::transition::TransitionResult;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard};

/// Cloneable handle to a machine behind an async mutex.
///
/// The lock is held for the whole transition protocol, so concurrent
/// requests are applied one at a time in lock acquisition order and never
/// observe a half-finished transition.
pub struct SharedMachine<C: Context> {
    inner: Arc<Mutex<StateMachine<C>>>,
}

impl<C: Context> SharedMachine<C> {
    pub fn new(machine: StateMachine<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(machine)),
        }
    }

    /// Exclusive access for anything the wrappers below do not cover.
    pub async fn lock(&self) -> MutexGuard<'_, StateMachine<C>> {
        self.inner.lock().await
    }

    pub async fn transition_to(&self, state_name: &str, params: Params) -> TransitionResult {
        self.inner.lock().await.transition_to(state_name, params).await
    }

    pub async fn can_transition_to(&self, state_name: &str, params: &Params) -> bool {
        self.inner
            .lock()
            .await
            .can_transition_to(state_name, params)
            .await
    }

    pub async fn fire_event(&self, event: &str, params: Params) -> bool {
        self.inner.lock().await.fire_event(event, params).await
    }

    pub async fn try_fire_event(&self, event: &str, params: Params) -> TransitionResult {
        self.inner.lock().await.try_fire_event(event, params).await
    }

    pub async fn execute_current(&self) {
        self.inner.lock().await.execute_current().await
    }

    pub async fn current_state_name(&self) -> String {
        self.inner.lock().await.current_state().name().to_string()
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<MachineEvent> {
        self.inner.lock().await.subscribe()
    }

    pub async fn restore_from_snapshot(&self, snapshot: &Snapshot) -> Result<(), CheckpointError> {
        self.inner.lock().await.restore_from_snapshot(snapshot)
    }
}

impl<C: Context + Serialize> SharedMachine<C> {
    pub async fn create_snapshot(&self) -> Result<Snapshot, CheckpointError> {
        self.inner.lock().await.create_snapshot()
    }
}

impl<C: Context> Clone for SharedMachine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Context> From<StateMachine<C>> for SharedMachine<C> {
    fn from(machine: StateMachine<C>) -> Self {
        Self::new(machine)
    }
}
