// src/resolve/resolver.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::graph::NodeInfo;
use crate::resolve::callback::{self, ResolveCallback};

/// Future returned by every resolver, whatever its calling convention.
pub type ResolveFuture<Id> =
    Pin<Box<dyn Future<Output = anyhow::Result<NodeInfo<Id>>> + Send + 'static>>;

/// Trait abstracting how a payload is mapped to node info.
///
/// The returned future must not borrow the payload; implementations clone
/// whatever they need before suspending. The driver keeps ownership of the
/// payload and registers it once the future settles.
pub trait NodeResolver<P, Id>: Send {
    fn resolve(&self, payload: &P) -> ResolveFuture<Id>;
}

/// Calling convention a [`Resolver`] was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    Sync,
    Callback,
    Future,
}

/// A resolver function normalised to the asynchronous contract.
///
/// Build one with [`Resolver::sync`], [`Resolver::callback`] or
/// [`Resolver::future`]. Cloning is cheap; clones share the function.
pub struct Resolver<P, Id> {
    inner: Arc<dyn Fn(&P) -> ResolveFuture<Id> + Send + Sync>,
    kind: ResolverKind,
}

impl<P, Id> Resolver<P, Id>
where
    P: 'static,
    Id: Send + 'static,
{
    /// Plain function. An `Err` becomes an asynchronous resolver failure.
    pub fn sync<F, E>(f: F) -> Self
    where
        F: Fn(&P) -> Result<NodeInfo<Id>, E> + Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        Self::from_fn(ResolverKind::Sync, move |payload: &P| {
            let outcome = f(payload).map_err(Into::<anyhow::Error>::into);
            let fut: ResolveFuture<Id> = Box::pin(std::future::ready(outcome));
            fut
        })
    }

    /// Function that reports its result through a [`ResolveCallback`].
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&P, ResolveCallback<Id>) + Send + Sync + 'static,
    {
        Self::from_fn(ResolverKind::Callback, move |payload: &P| {
            let (handle, rx) = ResolveCallback::channel();
            f(payload, handle);
            let fut: ResolveFuture<Id> = Box::pin(callback::wait_for(rx));
            fut
        })
    }

    /// Function returning a future of node info.
    pub fn future<F, Fut, E>(f: F) -> Self
    where
        F: Fn(&P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NodeInfo<Id>, E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        Self::from_fn(ResolverKind::Future, move |payload: &P| {
            let pending = f(payload);
            let fut: ResolveFuture<Id> =
                Box::pin(async move { pending.await.map_err(Into::<anyhow::Error>::into) });
            fut
        })
    }

    fn from_fn<F>(kind: ResolverKind, f: F) -> Self
    where
        F: Fn(&P) -> ResolveFuture<Id> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(f),
            kind,
        }
    }

    pub fn kind(&self) -> ResolverKind {
        self.kind
    }
}

impl<P, Id> Clone for Resolver<P, Id> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            kind: self.kind,
        }
    }
}

impl<P, Id> fmt::Debug for Resolver<P, Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<P, Id> NodeResolver<P, Id> for Resolver<P, Id> {
    fn resolve(&self, payload: &P) -> ResolveFuture<Id> {
        (self.inner)(payload)
    }
}
