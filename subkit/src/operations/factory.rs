use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::callbacks::{CacheStatus, CallbackCache, Keyed};
use crate::operations::runner::OperationRunner;
use crate::operations::work::{NetworkOperation, WorkItem, WorkState};

/// Glue between "is an equivalent operation already in flight" and "create
/// one if not".
///
/// One factory, with its own registry, exists per callback type; the
/// operation-name prefix baked into every cache key additionally keeps
/// identical individualized parts from colliding across operation types that
/// share a registry.
pub struct CacheableOperationFactory<C> {
    callbacks: CallbackCache<C>,
    runner: OperationRunner,
}

impl<C> CacheableOperationFactory<C>
where
    C: Keyed + Send + 'static,
{
    /// Creates a factory registering callbacks in `callbacks` and submitting
    /// new units to `runner`.
    pub fn new(callbacks: CallbackCache<C>, runner: OperationRunner) -> Self {
        Self { callbacks, runner }
    }

    /// Registers `callback` and, when it opened a fresh list for its key,
    /// builds and submits a new unit of work.
    ///
    /// Returns the new unit's state handle, or `None` when the callback
    /// joined an in-flight request and the fan-out alone will deliver the
    /// result. `make_operation` is only invoked in the first case.
    pub async fn create_or_join<F>(
        &self,
        callback: C,
        jitter: Duration,
        make_operation: F,
    ) -> Option<Arc<WorkState>>
    where
        F: FnOnce() -> Box<dyn NetworkOperation>,
    {
        let cache_key = callback.cache_key().clone();

        match self.callbacks.add(callback).await {
            CacheStatus::AddedToExistingInFlightList => {
                debug!(key = %cache_key, "joined in-flight request");
                None
            }
            CacheStatus::FirstCallbackAddedToList => {
                let work = WorkItem::new(cache_key, make_operation());
                let state = work.state();
                self.runner.submit_with_jitter(work, jitter).await;
                Some(state)
            }
        }
    }

    /// Registry shared with the operations this factory creates.
    pub fn callbacks(&self) -> &CallbackCache<C> {
        &self.callbacks
    }
}

impl<C> Clone for CacheableOperationFactory<C> {
    fn clone(&self) -> Self {
        Self {
            callbacks: self.callbacks.clone(),
            runner: self.runner.clone(),
        }
    }
}
