// src/engine/runtime.rs

use std::fmt::Debug;
use std::hash::Hash;
use std::pin::pin;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::errors::{Result, TopostreamError};
use crate::resolve::NodeResolver;

use super::core::SortCore;
use super::{DriverEvent, SortEvent, SortOptions, SortOutcome};

/// A running resolver, carrying its payload until it settles.
type Settlement<Id, P> = BoxFuture<'static, DriverEvent<Id, P>>;

/// Drives the core in response to input items and settled resolutions,
/// and forwards the resulting events over an mpsc channel.
///
/// This is a pure IO shell around `SortCore`, which contains all the sorting
/// semantics. All resolver futures are polled from this one task, so the
/// registry has a single writer.
pub struct SortRuntime<Id, P, R> {
    core: SortCore<Id, P>,
    resolver: R,
    options: SortOptions,
    output_tx: mpsc::Sender<SortEvent<Id, P>>,
}

impl<Id, P, R> SortRuntime<Id, P, R>
where
    Id: Eq + Hash + Clone + Debug + Send + 'static,
    P: Send + 'static,
    R: NodeResolver<P, Id>,
{
    pub fn new(resolver: R, options: SortOptions, output_tx: mpsc::Sender<SortEvent<Id, P>>) -> Self {
        Self {
            core: SortCore::new(),
            resolver,
            options,
            output_tx,
        }
    }

    /// Main loop.
    ///
    /// - Pulls payloads from `input` in arrival order and submits each one.
    /// - Feeds settled resolutions into the core as they complete.
    /// - Forwards every event the core produces, waiting for channel
    ///   capacity when the consumer is slow.
    /// - Returns once the core reports the output has ended.
    pub async fn run<S>(mut self, input: S) -> Result<SortOutcome<Id>>
    where
        S: Stream<Item = P> + Send,
    {
        info!(
            max_in_flight = ?self.options.max_in_flight,
            output_buffer = self.options.output_buffer,
            "sort driver started"
        );

        let mut input = pin!(input.fuse());
        let mut in_flight: FuturesUnordered<Settlement<Id, P>> = FuturesUnordered::new();
        let mut input_open = true;

        loop {
            let accepting = input_open && self.has_capacity(in_flight.len());

            let event = tokio::select! {
                biased;

                Some(event) = in_flight.next(), if !in_flight.is_empty() => event,

                item = input.next(), if accepting => match item {
                    Some(payload) => {
                        in_flight.push(self.submit(payload));
                        continue;
                    }
                    None => {
                        input_open = false;
                        DriverEvent::InputExhausted
                    }
                },

                else => {
                    warn!("no open input and nothing in flight; stopping driver");
                    break;
                }
            };

            let step = self.core.step(event);
            self.forward(step.outputs).await?;

            if step.done {
                break;
            }
        }

        let outcome = self.core.outcome();
        info!(
            submitted = outcome.stats.submitted,
            emitted = outcome.stats.emitted,
            failed = outcome.stats.failed,
            duplicates = outcome.stats.duplicates,
            unresolved = outcome.stats.unresolved,
            "sort driver finished"
        );
        if let Some(diagnosis) = &outcome.diagnosis {
            debug!(?diagnosis, "unresolved node diagnosis");
        }

        Ok(outcome)
    }

    fn has_capacity(&self, in_flight: usize) -> bool {
        self.options
            .max_in_flight
            .is_none_or(|cap| in_flight < cap.max(1))
    }

    /// Register a new submission and start its resolver.
    fn submit(&mut self, payload: P) -> Settlement<Id, P> {
        let submission = self.core.submit();
        let resolving = self.resolver.resolve(&payload);
        trace!(%submission, "payload submitted for resolution");

        Box::pin(async move {
            match resolving.await {
                Ok(info) => DriverEvent::Resolved {
                    submission,
                    info,
                    payload,
                },
                Err(reason) => DriverEvent::ResolveFailed { submission, reason },
            }
        })
    }

    async fn forward(&mut self, outputs: Vec<SortEvent<Id, P>>) -> Result<()> {
        for event in outputs {
            if self.output_tx.send(event).await.is_err() {
                warn!("output receiver dropped; stopping driver");
                return Err(TopostreamError::OutputClosed);
            }
        }
        Ok(())
    }
}
