// src/fetch/cache.rs

use crate::config::SeriesSpec;
use crate::error::FetchError;
use crate::fetch::FetchOutcome;
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, PoisonError, RwLock},
};
use tokio::sync::Mutex;
use tracing::debug;

type Slot = Arc<Mutex<Option<Arc<FetchOutcome>>>>;

/// Process-lifetime memo of successful fetches, keyed by the full
/// `SeriesSpec`. Each spec has its own async lock so concurrent requests for
/// the same spec wait on a single fetch. Failures are not stored.
#[derive(Default)]
pub struct FetchCache {
    slots: RwLock<HashMap<SeriesSpec, Slot>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, spec: &SeriesSpec) -> Slot {
        {
            let map_r = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = map_r.get(spec) {
                return Arc::clone(slot);
            }
        }
        let mut map_w = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map_w.entry(spec.clone()).or_default())
    }

    /// Cached outcome for `spec`, or run `fetch` and remember its success.
    /// The flag is `true` on a cache hit.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        spec: &SeriesSpec,
        fetch: F,
    ) -> Result<(Arc<FetchOutcome>, bool), FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FetchOutcome, FetchError>>,
    {
        loop {
            let slot = self.slot(spec);
            let mut guard = slot.lock().await;
            if let Some(hit) = guard.as_ref() {
                debug!(indicator = %spec.id, "fetch cache hit");
                return Ok((Arc::clone(hit), true));
            }
            // dropped by a failed fetch or an invalidate while we waited
            if !self.is_current(spec, &slot) {
                continue;
            }
            let mut pending = Pending {
                cache: self,
                spec,
                slot: &slot,
                filled: false,
            };
            let outcome = Arc::new(fetch().await?);
            *guard = Some(Arc::clone(&outcome));
            pending.filled = true;
            return Ok((outcome, false));
        }
    }

    fn is_current(&self, spec: &SeriesSpec, slot: &Slot) -> bool {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(spec)
            .map_or(false, |s| Arc::ptr_eq(s, slot))
    }

    fn remove_slot(&self, spec: &SeriesSpec, slot: &Slot) {
        let mut map_w = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if map_w.get(spec).map_or(false, |s| Arc::ptr_eq(s, slot)) {
            map_w.remove(spec);
        }
    }

    /// Forget `spec`; the next request fetches again. Returns whether an
    /// entry existed.
    pub fn invalidate(&self, spec: &SeriesSpec) -> bool {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(spec)
            .is_some()
    }

    pub fn clear(&self) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An empty slot whose fetch is running. Unless it gets filled, the slot is
/// taken out of the map when this drops, whether the fetch failed or the
/// caller was cancelled mid-fetch.
struct Pending<'a> {
    cache: &'a FetchCache,
    spec: &'a SeriesSpec,
    slot: &'a Slot,
    filled: bool,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if !self.filled {
            debug!(indicator = %self.spec.id, "dropping unfilled cache slot");
            self.cache.remove_slot(self.spec, self.slot);
        }
    }
}
