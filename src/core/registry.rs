//! Arena of state nodes with case-insensitive name lookup.

use super::state::{StateId, StateNode};
use super::Context;
use std::collections::HashMap;

/// Normalized lookup key for state, transition and event names.
pub(crate) fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Flat registry of every state in a machine.
///
/// Parent and child links are [`StateId`]s into this registry. The
/// hierarchy is acyclic by construction: the builder rejects any attach
/// that would make a state its own ancestor.
pub struct StateRegistry<C: Context> {
    nodes: Vec<StateNode<C>>,
    index: HashMap<String, StateId>,
}

impl<C: Context> StateRegistry<C> {
    pub(crate) fn from_nodes(nodes: Vec<StateNode<C>>) -> Self {
        let index = nodes
            .iter()
            .map(|node| (name_key(&node.name), node.id))
            .collect();
        Self { nodes, index }
    }

    /// Resolve a state name, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<StateId> {
        self.index.get(&name_key(name)).copied()
    }

    pub fn get(&self, id: StateId) -> Option<&StateNode<C>> {
        self.nodes.get(id.0)
    }

    pub fn by_name(&self, name: &str) -> Option<&StateNode<C>> {
        self.lookup(name).map(|id| self.node(id))
    }

    /// States in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &StateNode<C>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn node(&self, id: StateId) -> &StateNode<C> {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: StateId) -> &mut StateNode<C> {
        &mut self.nodes[id.0]
    }

    pub(crate) fn name(&self, id: StateId) -> &str {
        &self.nodes[id.0].name
    }

    /// Depth-first search of the subtree below `root` (excluding `root`).
    pub fn find_descendant(&self, root: StateId, name: &str) -> Option<StateId> {
        let key = name_key(name);
        self.descendants(root)
            .into_iter()
            .find(|id| name_key(self.name(*id)) == key)
    }

    /// True if `other` is `root` itself or one of its descendants.
    pub fn is_in_hierarchy(&self, root: StateId, other: StateId) -> bool {
        root == other || self.descendants(root).contains(&other)
    }

    /// Every state below `root`, depth-first pre-order.
    pub fn descendants(&self, root: StateId) -> Vec<StateId> {
        let mut out = Vec::new();
        let mut stack: Vec<StateId> = self.node(root).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// `root` and its initial children (recursively), parents before children.
    pub(crate) fn entry_order(&self, root: StateId) -> Vec<StateId> {
        self.preorder(root, |node| node.is_initial)
    }

    /// `root` and its initial children (recursively), children before parents.
    pub(crate) fn entry_check_order(&self, root: StateId) -> Vec<StateId> {
        self.postorder(root, |node| node.is_initial)
    }

    /// `root` and its active children (recursively), children before parents.
    pub(crate) fn exit_order(&self, root: StateId) -> Vec<StateId> {
        self.postorder(root, |node| node.active)
    }

    /// `root` and its active children (recursively), parents before children.
    pub(crate) fn active_order(&self, root: StateId) -> Vec<StateId> {
        self.preorder(root, |node| node.active)
    }

    fn preorder(&self, root: StateId, follow: impl Fn(&StateNode<C>) -> bool) -> Vec<StateId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let children = self.node(id).children.iter().rev();
            stack.extend(children.filter(|child| follow(self.node(**child))));
        }
        out
    }

    fn postorder(&self, root: StateId, follow: impl Fn(&StateNode<C>) -> bool) -> Vec<StateId> {
        let mut out = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
                continue;
            }
            stack.push((id, true));
            let children = self.node(id).children.iter().rev();
            stack.extend(
                children
                    .filter(|child| follow(self.node(**child)))
                    .map(|child| (*child, false)),
            );
        }
        out
    }
}
