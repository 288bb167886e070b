//! Structural validation of a configured machine.
//!
//! The analysis functions are pure over the state registry and the
//! transition list. Findings are accumulated with stillwater's
//! `Validation` so a single pass reports every problem rather than the
//! first one.

use crate::core::{Context, StateId, StateRegistry};
use crate::effects::Transition;
use std::collections::{BTreeSet, HashSet, VecDeque};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// A single structural finding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFinding {
    #[error("State '{state}' is unreachable from the initial state")]
    UnreachableState { state: String },

    #[error("Non-final state '{state}' has no outgoing transitions")]
    DeadEndState { state: String },

    #[error("Transition '{transition}' leaves final state '{state}'")]
    TransitionFromFinalState { transition: String, state: String },

    #[error("Transition '{transition}' failed validation")]
    InvalidTransition { transition: String },

    #[error("Transition '{transition}' validation faulted: {message}")]
    TransitionFaulted { transition: String, message: String },
}

/// Result of [`crate::effects::StateMachine::validate`].
///
/// Errors make the machine invalid; warnings are informational. Whether
/// errors are blocking is the host's decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationFinding>,
    pub warnings: Vec<ValidationFinding>,
}

type Check = Validation<(), NonEmptyVec<ValidationFinding>>;

fn collect(checks: Vec<Check>) -> Vec<ValidationFinding> {
    match Validation::all_vec(checks) {
        Validation::Success(_) => Vec::new(),
        Validation::Failure(findings) => findings.iter().cloned().collect(),
    }
}

/// States reachable from `initial` by following transitions.
///
/// Entering a composite state puts its whole subtree in play, so the
/// descendants of every reached state count as reached.
pub fn reachable_states<C: Context>(
    registry: &StateRegistry<C>,
    transitions: &[Transition<C>],
    initial: StateId,
) -> HashSet<StateId> {
    let mut reached = HashSet::new();
    let mut queue = VecDeque::from([initial]);

    while let Some(id) = queue.pop_front() {
        if !reached.insert(id) {
            continue;
        }
        queue.extend(registry.descendants(id));
        queue.extend(
            transitions
                .iter()
                .filter(|t| t.source == id)
                .map(|t| t.target),
        );
    }
    reached
}

/// Non-final states with no outgoing transition, at any nesting level.
pub fn dead_end_states<C: Context>(
    registry: &StateRegistry<C>,
    transitions: &[Transition<C>],
) -> Vec<StateId> {
    let sources: BTreeSet<StateId> = transitions.iter().map(|t| t.source).collect();
    registry
        .iter()
        .filter(|node| !node.is_final())
        .map(|node| node.id())
        .filter(|id| !sources.contains(id))
        .collect()
}

/// Full structural validation, including each transition's own check.
pub fn validate<C: Context>(
    registry: &StateRegistry<C>,
    transitions: &[Transition<C>],
    initial: StateId,
    context: &C,
) -> ValidationReport {
    let reachable = reachable_states(registry, transitions, initial);

    let mut warning_checks: Vec<Check> = registry
        .iter()
        .filter(|node| !node.is_initial() && !reachable.contains(&node.id()))
        .map(|node| {
            Validation::fail(ValidationFinding::UnreachableState {
                state: node.name().to_string(),
            })
        })
        .collect();

    let mut error_checks: Vec<Check> = dead_end_states(registry, transitions)
        .into_iter()
        .map(|id| {
            Validation::fail(ValidationFinding::DeadEndState {
                state: registry.name(id).to_string(),
            })
        })
        .collect();

    for transition in transitions {
        let source = registry.node(transition.source);
        if source.is_final() {
            error_checks.push(Validation::fail(
                ValidationFinding::TransitionFromFinalState {
                    transition: transition.name.clone(),
                    state: source.name().to_string(),
                },
            ));
        }

        match transition.validate(context) {
            Ok(true) => {}
            Ok(false) => warning_checks.push(Validation::fail(
                ValidationFinding::InvalidTransition {
                    transition: transition.name.clone(),
                },
            )),
            Err(fault) => error_checks.push(Validation::fail(
                ValidationFinding::TransitionFaulted {
                    transition: transition.name.clone(),
                    message: fault.to_string(),
                },
            )),
        }
    }

    let errors = collect(error_checks);
    let warnings = collect(warning_checks);
    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DefaultBehavior, HookError, StateMetrics, StateNode};
    use std::sync::Arc;

    fn state(id: usize, name: &str) -> StateNode<()> {
        StateNode {
            id: StateId(id),
            name: name.to_string(),
            description: String::new(),
            is_initial: false,
            is_final: false,
            parent: None,
            children: Vec::new(),
            level: 0,
            active: false,
            metrics: StateMetrics::default(),
            behavior: Arc::new(DefaultBehavior),
        }
    }

    fn edge(name: &str, source: usize, target: usize) -> Transition<()> {
        Transition {
            name: name.to_string(),
            trigger: None,
            priority: 0,
            source: StateId(source),
            target: StateId(target),
            guard: None,
            action: None,
            validator: None,
        }
    }

    // A(initial) -> B -> C(final)
    fn chain() -> (StateRegistry<()>, Vec<Transition<()>>) {
        let mut nodes = vec![state(0, "A"), state(1, "B"), state(2, "C")];
        nodes[0].is_initial = true;
        nodes[2].is_final = true;
        (
            StateRegistry::from_nodes(nodes),
            vec![edge("a-b", 0, 1), edge("b-c", 1, 2)],
        )
    }

    #[test]
    fn chain_is_valid() {
        let (registry, transitions) = chain();

        let report = validate(&registry, &transitions, StateId(0), &());

        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn reachability_follows_transitions_and_children() {
        let mut nodes = vec![state(0, "A"), state(1, "B"), state(2, "B1"), state(3, "Z")];
        nodes[1].children = vec![StateId(2)];
        nodes[2].parent = Some(StateId(1));
        let registry = StateRegistry::from_nodes(nodes);
        let transitions = vec![edge("a-b", 0, 1)];

        let reached = reachable_states(&registry, &transitions, StateId(0));

        assert!(reached.contains(&StateId(1)));
        assert!(reached.contains(&StateId(2)));
        assert!(!reached.contains(&StateId(3)));
    }

    #[test]
    fn dead_ends_skip_final_states_only() {
        let mut nodes = vec![state(0, "A"), state(1, "Stuck"), state(2, "Done")];
        nodes[2].is_final = true;
        let registry = StateRegistry::from_nodes(nodes);
        let transitions = vec![edge("a-stuck", 0, 1)];

        assert_eq!(dead_end_states(&registry, &transitions), vec![StateId(1)]);
    }

    #[test]
    fn nested_dead_end_is_an_error() {
        // A { Stuck } -> Z(final)
        let mut nodes = vec![state(0, "A"), state(1, "Stuck"), state(2, "Z")];
        nodes[0].is_initial = true;
        nodes[0].children = vec![StateId(1)];
        nodes[1].parent = Some(StateId(0));
        nodes[1].level = 1;
        nodes[2].is_final = true;
        let registry = StateRegistry::from_nodes(nodes);
        let transitions = vec![edge("a-z", 0, 2)];

        let report = validate(&registry, &transitions, StateId(0), &());

        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![ValidationFinding::DeadEndState {
                state: "Stuck".to_string()
            }]
        );
    }

    #[test]
    fn transition_out_of_final_state_is_an_error() {
        let (registry, mut transitions) = chain();
        transitions.push(edge("c-a", 2, 0));

        let report = validate(&registry, &transitions, StateId(0), &());

        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![ValidationFinding::TransitionFromFinalState {
                transition: "c-a".to_string(),
                state: "C".to_string(),
            }]
        );
    }

    #[test]
    fn transition_validators_produce_warnings_and_errors() {
        let (registry, mut transitions) = chain();
        transitions[0].validator = Some(Arc::new(|_: &()| Ok(false)));
        transitions[1].validator = Some(Arc::new(|_: &()| Err(HookError::new("no gateway"))));

        let report = validate(&registry, &transitions, StateId(0), &());

        assert_eq!(
            report.warnings,
            vec![ValidationFinding::InvalidTransition {
                transition: "a-b".to_string()
            }]
        );
        assert_eq!(
            report.errors,
            vec![ValidationFinding::TransitionFaulted {
                transition: "b-c".to_string(),
                message: "no gateway".to_string(),
            }]
        );
    }
}
