// src/graph/mod.rs

//! Incremental dependency graph.
//!
//! - [`node`] defines the arena records and the resolver-facing [`NodeInfo`].
//! - [`registry`] owns every known node and runs the resolution cascade.
//! - [`registry_step`] defines the result type for a single registration.
//! - [`diagnostics`] explains why nodes were left unresolved.

pub mod diagnostics;
pub mod node;
pub mod registry;
pub mod registry_step;

pub use diagnostics::UnresolvedDiagnosis;
pub use node::{NodeInfo, NodeRef, NodeState};
pub use registry::Registry;
pub use registry_step::{RegistryStep, ResolvedNode};
