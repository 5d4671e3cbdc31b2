// src/engine/core.rs

//! Pure core driver state machine.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`DriverEvent`]s and produces the [`SortEvent`]s the shell must forward.
//!
//! The async shell (`engine::runtime::SortRuntime`) is responsible for:
//! - pulling payloads from the input stream
//! - running resolver futures concurrently
//! - sending output events over the channel
//!
//! All registry mutation happens here, one event at a time, so two cascades
//! can never interleave.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{info, warn};

use crate::engine::event_handlers::{
    handle_drained, handle_failure, handle_resolved, CoreStep,
};
use crate::engine::{DriverEvent, SortOutcome, SortStats, SubmissionId};
use crate::graph::Registry;

/// Pure core driver state.
///
/// This owns:
/// - the node registry
/// - the pending set of submissions that have not settled
/// - the end-of-input flag and run counters
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct SortCore<Id, P> {
    registry: Registry<Id, P>,
    pending: BTreeSet<SubmissionId>,
    next_submission: u64,
    input_exhausted: bool,
    done: bool,
    stats: SortStats,
}

impl<Id, P> SortCore<Id, P>
where
    Id: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            pending: BTreeSet::new(),
            next_submission: 0,
            input_exhausted: false,
            done: false,
            stats: SortStats::default(),
        }
    }

    /// Accept one payload for resolution and return its pending token.
    pub fn submit(&mut self) -> SubmissionId {
        if self.input_exhausted {
            warn!("submission after end of input; it will not be awaited");
        }

        let submission = SubmissionId(self.next_submission);
        self.next_submission += 1;
        self.pending.insert(submission);
        self.stats.submitted += 1;
        submission
    }

    /// Handle a single driver event, updating core state and returning the
    /// events to forward downstream.
    pub fn step(&mut self, event: DriverEvent<Id, P>) -> CoreStep<Id, P> {
        if self.done {
            warn!("event after output ended; ignoring");
            return CoreStep {
                outputs: Vec::new(),
                done: true,
            };
        }

        let mut outputs = match event {
            DriverEvent::Resolved {
                submission,
                info,
                payload,
            } => handle_resolved(
                &mut self.registry,
                &mut self.pending,
                &mut self.stats,
                submission,
                info,
                payload,
            ),
            DriverEvent::ResolveFailed { submission, reason } => {
                handle_failure(&mut self.pending, &mut self.stats, submission, reason)
            }
            DriverEvent::InputExhausted => {
                info!(pending = self.pending.len(), "input exhausted; draining");
                self.input_exhausted = true;
                Vec::new()
            }
        };

        if self.input_exhausted && self.pending.is_empty() {
            outputs.extend(handle_drained(&self.registry, &mut self.stats));
            self.done = true;
        }

        CoreStep {
            outputs,
            done: self.done,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn registry(&self) -> &Registry<Id, P> {
        &self.registry
    }

    pub fn stats(&self) -> SortStats {
        self.stats
    }

    /// Final counters plus, if anything was left unresolved, an explanation.
    pub fn outcome(&self) -> SortOutcome<Id> {
        let diagnosis = (self.stats.unresolved > 0).then(|| self.registry.explain_unresolved());
        SortOutcome {
            stats: self.stats,
            diagnosis,
        }
    }
}

impl<Id, P> Default for SortCore<Id, P>
where
    Id: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::engine::SortEvent;
    use crate::graph::NodeInfo;

    fn resolved(
        core: &mut SortCore<u32, &'static str>,
        submission: SubmissionId,
        id: u32,
        deps: &[u32],
        payload: &'static str,
    ) -> CoreStep<u32, &'static str> {
        core.step(DriverEvent::Resolved {
            submission,
            info: NodeInfo::new(id, deps.iter().copied()),
            payload,
        })
    }

    fn items(step: CoreStep<u32, &'static str>) -> Vec<&'static str> {
        step.outputs
            .into_iter()
            .filter_map(SortEvent::into_item)
            .collect()
    }

    #[test]
    fn empty_input_finishes_cleanly() {
        let mut core: SortCore<u32, ()> = SortCore::new();
        let step = core.step(DriverEvent::InputExhausted);
        assert!(step.done);
        assert!(step.outputs.is_empty());
        assert_eq!(core.stats(), SortStats::default());
        assert!(core.outcome().diagnosis.is_none());
    }

    #[test]
    fn completion_waits_for_pending_resolutions() {
        let mut core = SortCore::new();
        let a = core.submit();
        let b = core.submit();

        let step = core.step(DriverEvent::InputExhausted);
        assert!(!step.done);
        assert_eq!(core.pending_count(), 2);

        assert_eq!(items(resolved(&mut core, b, 2, &[], "two")), vec!["two"]);
        assert!(!core.is_done());

        let step = resolved(&mut core, a, 1, &[2], "one");
        assert!(step.done);
        assert_eq!(items(step), vec!["one"]);
        assert_eq!(core.stats().emitted, 2);
    }

    #[test]
    fn unresolved_event_is_last_and_sent_once() {
        let mut core = SortCore::new();
        let a = core.submit();
        let b = core.submit();

        resolved(&mut core, a, 1, &[2], "one");
        core.step(DriverEvent::InputExhausted);
        let step = resolved(&mut core, b, 2, &[1], "two");

        assert!(step.done);
        match step.outputs.as_slice() {
            [SortEvent::Unresolved(unresolved)] => assert_eq!(unresolved.ids, vec![1, 2]),
            other => panic!("expected a single unresolved event, got {other:?}"),
        }

        let again = core.step(DriverEvent::InputExhausted);
        assert!(again.outputs.is_empty());
        assert_eq!(core.stats().unresolved, 2);
        let diagnosis = core.outcome().diagnosis.unwrap();
        assert_eq!(diagnosis.cycles, vec![vec![1, 2]]);
    }

    #[test]
    fn failure_is_reported_and_does_not_stop_the_core() {
        let mut core: SortCore<u32, &'static str> = SortCore::new();
        let a = core.submit();
        let b = core.submit();

        let step = core.step(DriverEvent::ResolveFailed {
            submission: a,
            reason: anyhow!("boom"),
        });
        match step.outputs.as_slice() {
            [SortEvent::ResolveFailed(failure)] => {
                assert_eq!(failure.submission, a);
                assert_eq!(failure.reason.to_string(), "boom");
            }
            other => panic!("expected a resolve failure, got {other:?}"),
        }

        assert_eq!(items(resolved(&mut core, b, 7, &[], "seven")), vec!["seven"]);
        let step = core.step(DriverEvent::InputExhausted);
        assert!(step.done);
        assert!(step.outputs.is_empty());
        assert_eq!(core.stats().failed, 1);
    }
}
