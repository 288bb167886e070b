//! Builder for state definitions.

use crate::core::{Context, DefaultBehavior, StateBehavior};
use std::fmt;
use std::sync::Arc;

/// A state as registered with a [`crate::builder::MachineBuilder`].
pub struct StateBuilder<C: Context> {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) is_initial: bool,
    pub(crate) is_final: bool,
    pub(crate) behavior: Arc<dyn StateBehavior<C>>,
}

impl<C: Context> StateBuilder<C> {
    /// Create a state with no hooks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            is_initial: false,
            is_final: false,
            behavior: Arc::new(DefaultBehavior),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark as the initial state of its level. For a composite state's
    /// children, the initial child is the one entered with the parent.
    pub fn initial(mut self) -> Self {
        self.is_initial = true;
        self
    }

    /// Mark as final: no transition may leave it.
    pub fn final_state(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Attach entry, exit and execute hooks.
    pub fn behavior(mut self, behavior: impl StateBehavior<C> + 'static) -> Self {
        self.behavior = Arc::new(behavior);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<C: Context> fmt::Debug for StateBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateBuilder")
            .field("name", &self.name)
            .field("is_initial", &self.is_initial)
            .field("is_final", &self.is_final)
            .finish_non_exhaustive()
    }
}
