// src/graph/registry.rs

//! Node registry and the resolution cascade.
//!
//! Nodes live in an arena keyed by id (insertion order = order of first
//! reference). Dependency and dependant relations are stored as arena
//! indices, so the graph never holds references into itself.

use std::fmt::Debug;
use std::hash::Hash;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::graph::diagnostics::UnresolvedDiagnosis;
use crate::graph::node::{Node, NodeInfo, NodeRef, NodeState};
use crate::graph::registry_step::{RegistryStep, ResolvedNode};

/// Holds every node referenced so far and decides when nodes can be emitted.
///
/// It is responsible for:
/// - creating placeholder nodes the first time an id is referenced
/// - linking a registered node to its dependencies (and back)
/// - resolving a node and every dependant it transitively unblocks
/// - reporting ids that never resolved
#[derive(Debug)]
pub struct Registry<Id, P> {
    nodes: IndexMap<Id, Node<P>>,
    resolved: usize,
    duplicates: u64,
}

impl<Id, P> Registry<Id, P>
where
    Id: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            resolved: 0,
            duplicates: 0,
        }
    }

    /// Return the node for `id`, creating a placeholder if it is unknown.
    pub fn get_or_create(&mut self, id: Id) -> NodeRef {
        match self.nodes.get_index_of(&id) {
            Some(index) => NodeRef(index),
            None => {
                trace!(?id, "creating placeholder node");
                let (index, _) = self.nodes.insert_full(id, Node::placeholder());
                NodeRef(index)
            }
        }
    }

    /// Register resolver output for a payload.
    ///
    /// - Each dependency id is mapped to a node (placeholders included).
    /// - The node is appended to the dependants of every dependency that is
    ///   not yet resolved.
    /// - Registering an id that is waiting replaces its payload and
    ///   dependencies. Registering an id that already resolved is ignored.
    ///
    /// Registration never resolves anything; call [`Self::cascade_resolve`].
    pub fn register(&mut self, info: NodeInfo<Id>, payload: P) -> NodeRef {
        let NodeInfo { id, deps } = info;
        let node = self.get_or_create(id);

        match self.nodes[node.0].state() {
            NodeState::Resolved => {
                self.duplicates += 1;
                warn!(
                    id = ?self.id_of(node),
                    "id already resolved; ignoring duplicate registration"
                );
                return node;
            }
            NodeState::Waiting => {
                self.duplicates += 1;
                warn!(
                    id = ?self.id_of(node),
                    "id registered again before resolving; replacing earlier registration"
                );
                self.detach_from_dependencies(node);
            }
            NodeState::Placeholder | NodeState::Unknown => {}
        }

        let dependencies: Vec<NodeRef> =
            deps.into_iter().map(|dep| self.get_or_create(dep)).collect();

        for &dep in &dependencies {
            let dep_node = &mut self.nodes[dep.0];
            if !dep_node.resolved {
                dep_node.dependants.push(node);
            }
        }

        debug!(
            id = ?self.id_of(node),
            deps = dependencies.len(),
            "registered node"
        );

        let entry = &mut self.nodes[node.0];
        entry.payload = Some(payload);
        entry.dependencies = dependencies;
        entry.registered = true;

        node
    }

    /// Resolve `node` if all of its dependencies are resolved, then every
    /// dependant this unblocks, transitively.
    ///
    /// The returned order is depth-first: a node comes before the cascades of
    /// its dependants, and dependants are visited in the order they
    /// registered. Returns an empty vector if `node` cannot resolve yet or is
    /// already resolved.
    pub fn cascade_resolve(&mut self, node: NodeRef) -> Vec<NodeRef> {
        let mut resolved = Vec::new();
        let mut stack = vec![node];

        while let Some(current) = stack.pop() {
            if !self.can_resolve(current) {
                continue;
            }

            let dependants = self.nodes[current.0].mark_resolved();
            self.resolved += 1;
            trace!(
                id = ?self.id_of(current),
                dependants = dependants.len(),
                "node resolved"
            );

            resolved.push(current);
            // Reversed so the first-registered dependant is popped first.
            stack.extend(dependants.into_iter().rev());
        }

        resolved
    }

    /// Register a node, run its cascade and move the released payloads out.
    pub fn resolve(&mut self, info: NodeInfo<Id>, payload: P) -> RegistryStep<Id, P> {
        let node = self.register(info, payload);
        let emitted = self
            .cascade_resolve(node)
            .into_iter()
            .filter_map(|r| self.take_resolved(r))
            .collect();

        RegistryStep { node, emitted }
    }

    /// Move the payload out of a resolved node.
    ///
    /// Returns `None` if the node is unresolved or its payload was already
    /// taken.
    pub fn take_resolved(&mut self, node: NodeRef) -> Option<ResolvedNode<Id, P>> {
        let (id, entry) = self.nodes.get_index_mut(node.0)?;
        if !entry.resolved {
            return None;
        }
        let payload = entry.payload.take()?;
        Some(ResolvedNode {
            id: id.clone(),
            payload,
        })
    }

    /// Every known id whose node is not resolved, in first-reference order.
    ///
    /// Covers nodes stuck behind cycles or missing dependencies as well as
    /// placeholders that were never registered.
    pub fn unresolved_ids(&self) -> Vec<Id> {
        self.nodes
            .iter()
            .filter(|(_, node)| !node.resolved)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Classify the unresolved ids into cycles, missing ids and blocked ids.
    pub fn explain_unresolved(&self) -> UnresolvedDiagnosis<Id> {
        UnresolvedDiagnosis::from_registry(self)
    }

    /// Read-only view of the given id's lifecycle.
    pub fn state_of(&self, id: &Id) -> NodeState {
        self.nodes
            .get(id)
            .map(Node::state)
            .unwrap_or(NodeState::Unknown)
    }

    pub fn id_of(&self, node: NodeRef) -> Option<&Id> {
        self.nodes.get_index(node.0).map(|(id, _)| id)
    }

    pub fn node_of(&self, id: &Id) -> Option<NodeRef> {
        self.nodes.get_index_of(id).map(NodeRef)
    }

    /// Declared dependencies of a waiting node. Empty once resolved.
    pub fn dependencies_of(&self, id: &Id) -> Vec<Id> {
        self.nodes
            .get(id)
            .map(|node| self.ids_for(&node.dependencies))
            .unwrap_or_default()
    }

    /// Nodes still waiting on `id`. Empty once resolved.
    pub fn dependants_of(&self, id: &Id) -> Vec<Id> {
        self.nodes
            .get(id)
            .map(|node| self.ids_for(&node.dependants))
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved
    }

    /// Number of registrations that hit an id that was already registered.
    pub fn duplicate_count(&self) -> u64 {
        self.duplicates
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = (NodeRef, &Id, &Node<P>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, (id, node))| (NodeRef(index), id, node))
    }

    fn can_resolve(&self, node: NodeRef) -> bool {
        let Some((_, entry)) = self.nodes.get_index(node.0) else {
            warn!(index = node.0, "node reference outside this registry");
            return false;
        };

        entry.registered
            && !entry.resolved
            && entry
                .dependencies
                .iter()
                .all(|dep| self.nodes[dep.0].resolved)
    }

    /// Remove `node` from the dependant lists of its current dependencies.
    fn detach_from_dependencies(&mut self, node: NodeRef) {
        let previous = std::mem::take(&mut self.nodes[node.0].dependencies);
        for dep in previous {
            self.nodes[dep.0].dependants.retain(|d| *d != node);
        }
    }

    fn ids_for(&self, refs: &[NodeRef]) -> Vec<Id> {
        refs.iter()
            .filter_map(|r| self.id_of(*r).cloned())
            .collect()
    }
}

impl<Id, P> Default for Registry<Id, P>
where
    Id: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
