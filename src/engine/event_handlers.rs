// src/engine/event_handlers.rs

//! Event handling logic for the core driver.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, warn};

use crate::engine::{ResolveFailure, SortEvent, SortStats, SubmissionId, UnresolvedNodes};
use crate::graph::{NodeInfo, Registry};

/// Decision returned by the core after handling a single `DriverEvent`.
#[derive(Debug)]
pub struct CoreStep<Id, P> {
    /// Events the shell should forward downstream, in order.
    pub outputs: Vec<SortEvent<Id, P>>,
    /// Whether the output has ended. No further events follow.
    pub done: bool,
}

/// Handle a successful resolution: register, cascade, emit.
pub fn handle_resolved<Id, P>(
    registry: &mut Registry<Id, P>,
    pending: &mut BTreeSet<SubmissionId>,
    stats: &mut SortStats,
    submission: SubmissionId,
    info: NodeInfo<Id>,
    payload: P,
) -> Vec<SortEvent<Id, P>>
where
    Id: Eq + Hash + Clone + Debug,
{
    settle(pending, submission);

    let step = registry.resolve(info, payload);
    stats.emitted += step.emitted.len() as u64;

    if !step.is_empty() {
        debug!(
            %submission,
            released = ?step.ids().collect::<Vec<_>>(),
            "cascade released nodes"
        );
    }

    step.emitted
        .into_iter()
        .map(|node| SortEvent::Item(node.payload))
        .collect()
}

/// Handle a resolver failure. The payload has already been dropped.
pub fn handle_failure<Id, P>(
    pending: &mut BTreeSet<SubmissionId>,
    stats: &mut SortStats,
    submission: SubmissionId,
    reason: anyhow::Error,
) -> Vec<SortEvent<Id, P>> {
    settle(pending, submission);
    stats.failed += 1;

    warn!(%submission, error = %format!("{reason:#}"), "resolver failed");

    vec![SortEvent::ResolveFailed(ResolveFailure { submission, reason })]
}

/// Final check once the input has ended and nothing is pending.
///
/// Returns the unresolved-dependency event, if any ids never resolved.
pub fn handle_drained<Id, P>(
    registry: &Registry<Id, P>,
    stats: &mut SortStats,
) -> Option<SortEvent<Id, P>>
where
    Id: Eq + Hash + Clone + Debug,
{
    let ids = registry.unresolved_ids();
    stats.unresolved = ids.len();
    stats.duplicates = registry.duplicate_count();

    if ids.is_empty() {
        return None;
    }

    warn!(count = ids.len(), ?ids, "input ended with unresolved nodes");
    Some(SortEvent::Unresolved(UnresolvedNodes { ids }))
}

fn settle(pending: &mut BTreeSet<SubmissionId>, submission: SubmissionId) {
    if !pending.remove(&submission) {
        warn!(%submission, "settlement for a submission that was not pending");
    }
}
