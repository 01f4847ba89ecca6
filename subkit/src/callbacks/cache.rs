use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

use crate::callbacks::key::CacheKey;

/// Types that know the cache key under which they coalesce.
pub trait Keyed {
    /// Key identifying the logical request this value belongs to.
    fn cache_key(&self) -> &CacheKey;
}

/// Outcome of registering a callback with [`CallbackCache::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The callback opened a fresh list for its key. The caller must start a
    /// new unit of work.
    FirstCallbackAddedToList,
    /// The callback joined the list of an in-flight request. The caller must
    /// not start a duplicate.
    AddedToExistingInFlightList,
}

/// Internal storage for the coalescing registry.
struct Inner<C> {
    callbacks_by_key: HashMap<CacheKey, Vec<C>>,
}

/// The coalescing registry: maps a cache key to the ordered list of callbacks
/// waiting on that key's in-flight request.
///
/// All mutation passes through one mutex, so "check cache, decide, register"
/// is a single serialized step. Splitting it would let two callers both
/// observe "I'm first" and launch duplicate work. Clones share the same
/// registry.
pub struct CallbackCache<C> {
    inner: Arc<Mutex<Inner<C>>>,
}

impl<C> CallbackCache<C>
where
    C: Keyed + Send,
{
    /// Creates a new empty registry.
    pub fn new() -> Self {
        let inner = Inner {
            callbacks_by_key: HashMap::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Appends `callback` to the list for its key, creating the list if
    /// absent.
    ///
    /// Returns whether this was the first entry for the key, which signals
    /// the caller to start a new unit of work.
    /// [`CacheStatus::AddedToExistingInFlightList`] means an equivalent
    /// request is already in flight and its fan-out will deliver the result.
    pub async fn add(&self, callback: C) -> CacheStatus {
        let mut inner = self.inner.lock().await;

        let callbacks = inner
            .callbacks_by_key
            .entry(callback.cache_key().clone())
            .or_default();
        callbacks.push(callback);

        if callbacks.len() == 1 {
            CacheStatus::FirstCallbackAddedToList
        } else {
            CacheStatus::AddedToExistingInFlightList
        }
    }

    /// Atomically detaches the full list for `key`, then invokes `action`
    /// once per detached entry in registration order.
    ///
    /// Detachment happens under the registry lock and invocation after it is
    /// released, so a callback registered concurrently either made it into
    /// the detached batch or opens a fresh list and is reported as first.
    /// Unknown keys are a no-op.
    pub async fn perform_on_all_items_and_remove_from_cache<F>(&self, key: &CacheKey, mut action: F)
    where
        F: FnMut(C),
    {
        let detached = {
            let mut inner = self.inner.lock().await;
            inner.callbacks_by_key.remove(key)
        };

        let Some(callbacks) = detached else {
            return;
        };

        trace!(key = %key, count = callbacks.len(), "draining callbacks");

        for callback in callbacks {
            action(callback);
        }
    }
}

impl<C> Default for CallbackCache<C>
where
    C: Keyed + Send,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for CallbackCache<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for CallbackCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackCache").finish()
    }
}
