// src/resolve/callback.rs

//! Completion handle for callback-style resolvers.

use anyhow::anyhow;
use tokio::sync::oneshot;
use tracing::debug;

use crate::graph::NodeInfo;

/// One-shot completion handle passed to callback-style resolvers.
///
/// The resolver may complete it immediately or later, from any task or
/// thread. Dropping it without completing counts as a resolver failure.
#[derive(Debug)]
pub struct ResolveCallback<Id> {
    tx: oneshot::Sender<anyhow::Result<NodeInfo<Id>>>,
}

impl<Id> ResolveCallback<Id> {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<anyhow::Result<NodeInfo<Id>>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Complete with either node info or a failure reason.
    pub fn complete<E>(self, outcome: Result<NodeInfo<Id>, E>)
    where
        E: Into<anyhow::Error>,
    {
        if self.tx.send(outcome.map_err(Into::<anyhow::Error>::into)).is_err() {
            debug!("resolution result arrived after the driver stopped waiting");
        }
    }

    pub fn ok(self, info: NodeInfo<Id>) {
        self.complete(Ok::<_, anyhow::Error>(info));
    }

    pub fn fail<E>(self, reason: E)
    where
        E: Into<anyhow::Error>,
    {
        self.complete(Err(reason));
    }
}

/// Await a callback's completion, mapping a dropped handle to a failure.
pub(crate) async fn wait_for<Id>(
    rx: oneshot::Receiver<anyhow::Result<NodeInfo<Id>>>,
) -> anyhow::Result<NodeInfo<Id>> {
    match rx.await {
        Ok(outcome) => outcome,
        Err(_) => Err(anyhow!(
            "resolver dropped its callback without completing it"
        )),
    }
}
