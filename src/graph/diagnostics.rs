// src/graph/diagnostics.rs

//! Explanations for nodes that never resolved.
//!
//! The unresolved-dependency error only lists ids. This module splits that
//! list into the usual root causes so that callers (the CLI in particular)
//! can print something actionable.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::graph::node::{NodeRef, NodeState};
use crate::graph::registry::Registry;

/// Unresolved ids grouped by cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedDiagnosis<Id> {
    /// Groups of ids that wait on each other (self-dependencies included).
    /// Each group is in first-reference order.
    pub cycles: Vec<Vec<Id>>,
    /// Ids referenced as dependencies but never registered.
    pub missing: Vec<Id>,
    /// Registered ids that wait, directly or transitively, on a cycle or a
    /// missing id without being part of a cycle themselves.
    pub blocked: Vec<Id>,
}

impl<Id> UnresolvedDiagnosis<Id> {
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty() && self.missing.is_empty() && self.blocked.is_empty()
    }
}

impl<Id> UnresolvedDiagnosis<Id>
where
    Id: Eq + Hash + Clone + Debug,
{
    pub(crate) fn from_registry<P>(registry: &Registry<Id, P>) -> Self {
        // Edge direction: dependency -> dependant, over unresolved nodes only.
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        let mut missing = Vec::new();

        for (node, id, entry) in registry.nodes() {
            if entry.resolved {
                continue;
            }
            graph.add_node(node.index());
            if entry.state() == NodeState::Placeholder {
                missing.push(id.clone());
            }
            for dep in &entry.dependencies {
                graph.add_edge(dep.index(), node.index(), ());
            }
        }

        let mut cycles: Vec<Vec<usize>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|n| graph.contains_edge(*n, *n))
            })
            .map(|mut component| {
                component.sort_unstable();
                component
            })
            .collect();
        cycles.sort_unstable_by_key(|component| component[0]);

        let in_cycle: HashSet<usize> = cycles.iter().flatten().copied().collect();

        let blocked = registry
            .nodes()
            .filter(|(node, _, entry)| {
                !entry.resolved
                    && entry.state() == NodeState::Waiting
                    && !in_cycle.contains(&node.index())
            })
            .map(|(_, id, _)| id.clone())
            .collect();

        let cycles = cycles
            .into_iter()
            .map(|component| {
                component
                    .into_iter()
                    .filter_map(|index| registry.id_of(NodeRef(index)).cloned())
                    .collect()
            })
            .collect();

        Self {
            cycles,
            missing,
            blocked,
        }
    }
}
