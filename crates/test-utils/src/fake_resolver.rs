use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use topostream::{NodeResolver, ResolveFuture};

use crate::builders::Item;

/// Failure reason reported for ids marked with [`FakeResolver::failing`].
pub const FAKE_FAILURE: &str = "ERROR";

/// A fake resolver that:
/// - records which ids it was asked to resolve, in call order
/// - settles each id after a configurable delay
/// - fails the ids it was told to fail with [`FAKE_FAILURE`]
/// - tracks how many resolutions were in flight at once
#[derive(Debug, Clone, Default)]
pub struct FakeResolver {
    delays: HashMap<u32, Duration>,
    default_delay: Option<Duration>,
    failing: HashSet<u32>,
    calls: Arc<Mutex<Vec<u32>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, id: u32, delay: Duration) -> Self {
        self.delays.insert(id, delay);
        self
    }

    /// Delay for ids without their own delay.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn failing(mut self, id: u32) -> Self {
        self.failing.insert(id);
        self
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of unsettled resolutions seen at any one time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl NodeResolver<Item, u32> for FakeResolver {
    fn resolve(&self, item: &Item) -> ResolveFuture<u32> {
        self.calls.lock().unwrap().push(item.id);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(&item.id).copied().or(self.default_delay);
        let fail = self.failing.contains(&item.id);
        let info = item.info();
        let in_flight = Arc::clone(&self.in_flight);

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);

            if fail {
                Err(anyhow!(FAKE_FAILURE))
            } else {
                Ok(info)
            }
        })
    }
}
