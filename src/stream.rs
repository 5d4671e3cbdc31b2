// src/stream.rs

//! Stream adapter over the resolution driver.
//!
//! [`TopoSort`] takes an input `Stream` of payloads and produces a stream of
//! [`SortEvent`]s: every payload in dependency order, interleaved with
//! resolver failures, and optionally ending with the unresolved ids.

use std::fmt::Debug;
use std::hash::Hash;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::engine::{
    ResolveFailure, SortEvent, SortOptions, SortOutcome, SortRuntime, SortStats, UnresolvedNodes,
};
use crate::errors::Result;
use crate::graph::UnresolvedDiagnosis;
use crate::resolve::NodeResolver;

/// Online topological sort, configured with one resolver.
#[derive(Debug, Clone)]
pub struct TopoSort<R> {
    resolver: R,
    options: SortOptions,
}

impl<R> TopoSort<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            options: SortOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SortOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> SortOptions {
        self.options
    }

    /// Start sorting `input` on the tokio runtime.
    ///
    /// Must be called from within a runtime. The returned stream ends after
    /// the final unresolved check.
    pub fn spawn<Id, P, S>(self, input: S) -> SortedStream<Id, P>
    where
        Id: Eq + Hash + Clone + Debug + Send + 'static,
        P: Send + 'static,
        R: NodeResolver<P, Id> + 'static,
        S: Stream<Item = P> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.options.output_buffer.max(1));
        let runtime = SortRuntime::new(self.resolver, self.options, tx);
        let handle = tokio::spawn(runtime.run(input));
        SortedStream { rx, handle }
    }

    /// Sort `input` on the current task, sending events to `sink`.
    ///
    /// `sink` is dropped on return, which closes the output for the
    /// receiver. `output_buffer` is ignored; the caller chose the capacity.
    pub async fn run<Id, P, S>(
        self,
        input: S,
        sink: mpsc::Sender<SortEvent<Id, P>>,
    ) -> Result<SortOutcome<Id>>
    where
        Id: Eq + Hash + Clone + Debug + Send + 'static,
        P: Send + 'static,
        R: NodeResolver<P, Id>,
        S: Stream<Item = P> + Send,
    {
        SortRuntime::new(self.resolver, self.options, sink)
            .run(input)
            .await
    }
}

/// Output side of a spawned sort.
///
/// Yields `None` once the driver has finished.
#[derive(Debug)]
pub struct SortedStream<Id, P> {
    rx: mpsc::Receiver<SortEvent<Id, P>>,
    handle: JoinHandle<Result<SortOutcome<Id>>>,
}

impl<Id, P> SortedStream<Id, P> {
    /// Next event, or `None` at end of output.
    pub async fn recv(&mut self) -> Option<SortEvent<Id, P>> {
        self.rx.recv().await
    }

    /// Discard any remaining events and wait for the driver's outcome.
    pub async fn join(mut self) -> Result<SortOutcome<Id>> {
        let mut skipped = 0usize;
        while self.rx.recv().await.is_some() {
            skipped += 1;
        }
        if skipped > 0 {
            debug!(skipped, "discarded events while joining sort");
        }
        self.handle.await?
    }

    /// Consume every event and return them grouped, with the run outcome.
    pub async fn collect_report(mut self) -> Result<SortReport<Id, P>> {
        let mut items = Vec::new();
        let mut failures = Vec::new();
        let mut unresolved = None;

        while let Some(event) = self.rx.recv().await {
            match event {
                SortEvent::Item(payload) => items.push(payload),
                SortEvent::ResolveFailed(failure) => failures.push(failure),
                SortEvent::Unresolved(nodes) => unresolved = Some(nodes),
            }
        }

        let outcome = self.handle.await??;
        Ok(SortReport {
            items,
            failures,
            unresolved,
            stats: outcome.stats,
            diagnosis: outcome.diagnosis,
        })
    }
}

impl<Id, P> Stream for SortedStream<Id, P> {
    type Item = SortEvent<Id, P>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Everything one sort produced.
#[derive(Debug)]
pub struct SortReport<Id, P> {
    /// Payloads in emission order.
    pub items: Vec<P>,
    pub failures: Vec<ResolveFailure>,
    pub unresolved: Option<UnresolvedNodes<Id>>,
    pub stats: SortStats,
    pub diagnosis: Option<UnresolvedDiagnosis<Id>>,
}

impl<Id, P> SortReport<Id, P> {
    /// No resolver failed and every id resolved.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.unresolved.is_none()
    }

    pub fn unresolved_ids(&self) -> &[Id] {
        self.unresolved
            .as_ref()
            .map(|nodes| nodes.ids.as_slice())
            .unwrap_or_default()
    }
}
