// src/graph/registry_step.rs

//! Result types for a single registration.

use crate::graph::node::NodeRef;

/// A node released by a cascade, with its payload moved out of the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode<Id, P> {
    pub id: Id,
    pub payload: P,
}

/// Structured result of registering one node and running its cascade.
#[derive(Debug, Clone)]
pub struct RegistryStep<Id, P> {
    /// The node that was registered.
    pub node: NodeRef,
    /// Every node the cascade resolved, dependencies before dependants.
    pub emitted: Vec<ResolvedNode<Id, P>>,
}

impl<Id, P> RegistryStep<Id, P> {
    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &Id> {
        self.emitted.iter().map(|n| &n.id)
    }
}
