//! Guard predicates and transition actions.
//!
//! Both are stored as effect factories: each evaluation builds a fresh
//! effect from the transition parameters and runs it against the machine
//! context. Effects may suspend, so a guard can await a downstream check
//! before answering.

use super::{Context, Params};
use std::fmt;
use std::sync::Arc;
use stillwater::effect::{BoxedEffect, Effect};
use stillwater::prelude::*;
use thiserror::Error;

/// Failure reported by a guard, action or transition validator.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct HookError {
    /// Human-readable failure description
    pub message: String,
    /// Underlying cause, if the hook wrapped another error
    pub cause: Option<String>,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the underlying cause.
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

type GuardFactory<C> = Arc<dyn Fn(&Params) -> BoxedEffect<bool, HookError, C> + Send + Sync>;
type ActionFactory<C> = Arc<dyn Fn(&Params) -> BoxedEffect<(), HookError, C> + Send + Sync>;

/// Structural check run by the validator, independent of parameters.
pub type TransitionValidator<C> = Arc<dyn Fn(&C) -> Result<bool, HookError> + Send + Sync>;

/// Predicate that decides whether a transition may proceed.
///
/// # Example
///
/// ```rust
/// use statekeeper::core::Guard;
///
/// #[derive(Clone)]
/// struct Payment {
///     amount: u64,
/// }
///
/// let positive = Guard::new(|payment: &Payment, _params| payment.amount > 0);
/// # let _ = positive;
/// ```
pub struct Guard<C: Context> {
    factory: GuardFactory<C>,
}

impl<C: Context> Guard<C> {
    /// Create a guard from a synchronous predicate over context and parameters.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C, &Params) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Self::from_effect(move |params: &Params| {
            let predicate = Arc::clone(&predicate);
            let params = params.clone();
            from_fn(move |context: &C| Ok::<bool, HookError>(predicate(context, &params))).boxed()
        })
    }

    /// Create a guard from an effect factory. Use this when the check
    /// needs to suspend.
    pub fn from_effect<F>(factory: F) -> Self
    where
        F: Fn(&Params) -> BoxedEffect<bool, HookError, C> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Evaluate the guard against the context.
    pub async fn check(&self, context: &C, params: &Params) -> Result<bool, HookError> {
        (self.factory)(params).run(context).await
    }
}

impl<C: Context> Clone for Guard<C> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<C: Context> fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}

/// Side-effecting work performed while a transition executes.
///
/// An action that fails aborts its transition before any state changes.
pub struct Action<C: Context> {
    factory: ActionFactory<C>,
}

impl<C: Context> Action<C> {
    /// Create an action from a synchronous closure.
    pub fn new<F>(action: F) -> Self
    where
        F: Fn(&C, &Params) -> Result<(), HookError> + Send + Sync + 'static,
    {
        let action = Arc::new(action);
        Self::from_effect(move |params: &Params| {
            let action = Arc::clone(&action);
            let params = params.clone();
            from_fn(move |context: &C| action(context, &params)).boxed()
        })
    }

    /// Create an action from an effect factory.
    pub fn from_effect<F>(factory: F) -> Self
    where
        F: Fn(&Params) -> BoxedEffect<(), HookError, C> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Run the action against the context.
    pub async fn run(&self, context: &C, params: &Params) -> Result<(), HookError> {
        (self.factory)(params).run(context).await
    }
}

impl<C: Context> Clone for Action<C> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<C: Context> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Clone)]
    struct Payment {
        amount: i64,
    }

    fn params_with(key: &str) -> Params {
        let mut params = Params::new();
        params.insert(key.to_string(), json!("value"));
        params
    }

    #[tokio::test]
    async fn guard_reads_context() {
        let guard = Guard::new(|p: &Payment, _: &Params| p.amount > 0);

        assert_eq!(guard.check(&Payment { amount: 100 }, &Params::new()).await, Ok(true));
        assert_eq!(guard.check(&Payment { amount: 0 }, &Params::new()).await, Ok(false));
    }

    #[tokio::test]
    async fn guard_reads_params() {
        let guard = Guard::new(|_: &Payment, params: &Params| params.contains_key("TransactionId"));
        let payment = Payment { amount: 1 };

        assert_eq!(guard.check(&payment, &params_with("TransactionId")).await, Ok(true));
        assert_eq!(guard.check(&payment, &params_with("ErrorCode")).await, Ok(false));
    }

    #[tokio::test]
    async fn guard_is_deterministic() {
        let guard = Guard::new(|p: &Payment, _: &Params| p.amount % 2 == 0);
        let payment = Payment { amount: 4 };

        let first = guard.check(&payment, &Params::new()).await;
        let second = guard.check(&payment, &Params::new()).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn effect_guard_can_fail() {
        let guard: Guard<Payment> =
            Guard::from_effect(|_| fail(HookError::new("ledger unavailable")).boxed());

        let result = guard.check(&Payment { amount: 1 }, &Params::new()).await;

        assert_eq!(result, Err(HookError::new("ledger unavailable")));
    }

    #[tokio::test]
    async fn action_reports_failure_verbatim() {
        let action = Action::new(|p: &Payment, _: &Params| {
            if p.amount > 1_000 {
                Err(HookError::new("limit exceeded").with_cause("amount 5000"))
            } else {
                Ok(())
            }
        });

        assert!(action.run(&Payment { amount: 10 }, &Params::new()).await.is_ok());

        let err = action
            .run(&Payment { amount: 5_000 }, &Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.message, "limit exceeded");
        assert_eq!(err.cause.as_deref(), Some("amount 5000"));
    }

    #[tokio::test]
    async fn pure_action_succeeds() {
        let action: Action<Payment> = Action::from_effect(|_| pure(()).boxed());

        assert!(action.run(&Payment { amount: 1 }, &Params::new()).await.is_ok());
    }
}
