// src/resolve/mod.rs

//! Pluggable node resolvers.
//!
//! The driver talks to a [`NodeResolver`] instead of a concrete function.
//! [`Resolver`] adapts the three supported calling conventions (plain
//! function, completion callback, future-returning function) to that trait
//! once, at construction time. Tests can implement the trait directly.

pub mod callback;
pub mod resolver;

pub use callback::ResolveCallback;
pub use resolver::{NodeResolver, ResolveFuture, Resolver, ResolverKind};
