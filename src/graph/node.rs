// src/graph/node.rs

//! Arena records for the dependency graph.

use serde::Deserialize;

/// Position of a node inside a [`Registry`](super::Registry) arena.
///
/// Indices are stable for the lifetime of the registry; nodes are never
/// removed, only resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub(crate) usize);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a resolver produces for one input payload.
///
/// `deps` may be omitted when deserializing; it defaults to empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeInfo<Id> {
    pub id: Id,
    #[serde(default)]
    pub deps: Vec<Id>,
}

impl<Id> NodeInfo<Id> {
    pub fn new(id: Id, deps: impl IntoIterator<Item = Id>) -> Self {
        Self {
            id,
            deps: deps.into_iter().collect(),
        }
    }

    /// Node info with no dependencies.
    pub fn leaf(id: Id) -> Self {
        Self {
            id,
            deps: Vec::new(),
        }
    }
}

/// Public, read-only view of a node's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// The id has never been referenced.
    Unknown,
    /// Referenced only as someone's dependency; no payload registered yet.
    Placeholder,
    /// Registered, but at least one dependency is still unresolved.
    Waiting,
    /// Emitted. Terminal.
    Resolved,
}

/// Internal node record.
#[derive(Debug)]
pub(crate) struct Node<P> {
    /// Original input item. `None` for placeholders and after emission.
    pub(crate) payload: Option<P>,
    /// Declared dependencies, in declaration order.
    pub(crate) dependencies: Vec<NodeRef>,
    /// Nodes still waiting on this one, in the order they registered.
    pub(crate) dependants: Vec<NodeRef>,
    /// Whether resolver output has been registered for this id.
    pub(crate) registered: bool,
    pub(crate) resolved: bool,
}

impl<P> Node<P> {
    pub(crate) fn placeholder() -> Self {
        Self {
            payload: None,
            dependencies: Vec::new(),
            dependants: Vec::new(),
            registered: false,
            resolved: false,
        }
    }

    pub(crate) fn state(&self) -> NodeState {
        match (self.registered, self.resolved) {
            (_, true) => NodeState::Resolved,
            (true, false) => NodeState::Waiting,
            (false, false) => NodeState::Placeholder,
        }
    }

    /// Mark resolved and release the bookkeeping, returning the dependants
    /// that were waiting on this node.
    pub(crate) fn mark_resolved(&mut self) -> Vec<NodeRef> {
        self.resolved = true;
        self.dependencies = Vec::new();
        std::mem::take(&mut self.dependants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_distinct_from_resolved() {
        let node: Node<()> = Node::placeholder();
        assert_eq!(node.state(), NodeState::Placeholder);
        assert!(node.payload.is_none());
    }

    #[test]
    fn mark_resolved_releases_bookkeeping() {
        let mut node: Node<&str> = Node::placeholder();
        node.registered = true;
        node.payload = Some("a");
        node.dependencies.push(NodeRef(3));
        node.dependants.push(NodeRef(1));
        node.dependants.push(NodeRef(2));

        let dependants = node.mark_resolved();

        assert_eq!(dependants, vec![NodeRef(1), NodeRef(2)]);
        assert!(node.dependencies.is_empty());
        assert!(node.dependants.is_empty());
        assert_eq!(node.state(), NodeState::Resolved);
    }

    #[test]
    fn node_info_deps_default_to_empty() {
        let info: NodeInfo<u32> = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(info, NodeInfo::leaf(7));

        let info: NodeInfo<String> =
            serde_json::from_str(r#"{"id": "b", "deps": ["a"]}"#).unwrap();
        assert_eq!(info, NodeInfo::new("b".to_string(), ["a".to_string()]));
    }
}
