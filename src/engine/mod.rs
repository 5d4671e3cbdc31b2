// src/engine/mod.rs

//! Resolution driver.
//!
//! This module ties together:
//! - the node registry (what can be emitted, and when)
//! - the pending set of in-flight resolutions
//! - the end-of-input completion check
//!
//! The pure core state machine lives in [`core`]; the async shell that polls
//! the input stream and the resolver futures is implemented in [`runtime`].

use std::fmt;

use thiserror::Error;

use crate::graph::{NodeInfo, UnresolvedDiagnosis};

/// Unique token for one submitted payload.
///
/// Tokens only need to be unique and removable; their numeric order carries
/// no meaning for emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionId(u64);

impl SubmissionId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Driver tuning shared by the core and the async shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOptions {
    /// Stop pulling input while this many resolutions are in flight.
    /// `None` means unbounded.
    pub max_in_flight: Option<usize>,
    /// Capacity of the output channel. Sends wait for the consumer once it
    /// is full.
    pub output_buffer: usize,
}

impl SortOptions {
    pub const DEFAULT_OUTPUT_BUFFER: usize = 64;

    /// `0` means unbounded, matching the config file convention.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = (max > 0).then_some(max);
        self
    }

    pub fn with_output_buffer(mut self, capacity: usize) -> Self {
        self.output_buffer = capacity.max(1);
        self
    }
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            max_in_flight: None,
            output_buffer: Self::DEFAULT_OUTPUT_BUFFER,
        }
    }
}

/// Events flowing into the core from the async shell.
#[derive(Debug)]
pub enum DriverEvent<Id, P> {
    /// A resolver produced node info for a submitted payload.
    Resolved {
        submission: SubmissionId,
        info: NodeInfo<Id>,
        payload: P,
    },
    /// A resolver failed for a submitted payload.
    ResolveFailed {
        submission: SubmissionId,
        reason: anyhow::Error,
    },
    /// The input source signalled end-of-sequence.
    InputExhausted,
}

/// Events flowing out of the driver, in emission order.
#[derive(Debug)]
pub enum SortEvent<Id, P> {
    /// A payload whose dependencies have all been emitted.
    Item(P),
    /// One resolver invocation failed. The sort keeps going.
    ResolveFailed(ResolveFailure),
    /// Ids that never resolved. Sent at most once, as the last event.
    Unresolved(UnresolvedNodes<Id>),
}

impl<Id, P> SortEvent<Id, P> {
    pub fn into_item(self) -> Option<P> {
        match self {
            SortEvent::Item(payload) => Some(payload),
            _ => None,
        }
    }
}

/// A resolver failure. Carries the reason, never the payload.
#[derive(Debug, Error)]
#[error("failed to resolve submission {submission}: {reason:#}")]
pub struct ResolveFailure {
    pub submission: SubmissionId,
    pub reason: anyhow::Error,
}

/// Ids left unresolved when the input ended.
///
/// Cycles, self-dependencies and ids that were referenced but never
/// submitted are reported alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedNodes<Id> {
    pub ids: Vec<Id>,
}

impl<Id: fmt::Debug> fmt::Display for UnresolvedNodes<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} node(s) never resolved: {:?}", self.ids.len(), self.ids)
    }
}

impl<Id: fmt::Debug> std::error::Error for UnresolvedNodes<Id> {}

/// Counters for one sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStats {
    pub submitted: u64,
    pub emitted: u64,
    pub failed: u64,
    pub duplicates: u64,
    pub unresolved: usize,
}

/// What the driver returns once the output has ended.
#[derive(Debug, Clone)]
pub struct SortOutcome<Id> {
    pub stats: SortStats,
    /// Present only when some ids were left unresolved.
    pub diagnosis: Option<UnresolvedDiagnosis<Id>>,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use self::core::SortCore;
pub use event_handlers::CoreStep;
pub use runtime::SortRuntime;
