use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

use crate::callbacks::CacheKey;

const EXECUTING: u8 = 0b001;
const FINISHED: u8 = 0b010;
const CANCELLED: u8 = 0b100;

/// Observable lifecycle state of one unit of work.
///
/// The flags live in a single atomic, so every transition is one
/// compare-and-set and `finished` can never be observed while `executing` is
/// still set: both bits change in the same store. Transitions are monotonic,
/// pending → executing → finished, or pending → cancelled.
#[derive(Debug, Default)]
pub struct WorkState {
    bits: AtomicU8,
}

impl WorkState {
    /// Creates a state in the pending phase.
    pub fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Whether the operation body is currently running.
    pub fn is_executing(&self) -> bool {
        self.bits.load(Ordering::Acquire) & EXECUTING != 0
    }

    /// Whether the unit reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.bits.load(Ordering::Acquire) & FINISHED != 0
    }

    /// Whether the unit was cancelled before it started executing.
    pub fn is_cancelled(&self) -> bool {
        self.bits.load(Ordering::Acquire) & CANCELLED != 0
    }

    /// Attempts the pending → executing transition.
    ///
    /// Fails when the unit already started, finished, or was cancelled, so a
    /// unit can never re-enter execution.
    pub(crate) fn try_start(&self) -> bool {
        self.bits
            .compare_exchange(0, EXECUTING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Performs the executing → finished transition.
    pub(crate) fn finish(&self) -> bool {
        self.bits
            .compare_exchange(EXECUTING, FINISHED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Attempts the pending → cancelled transition.
    ///
    /// Succeeds only while the unit has not started executing; a running or
    /// already-terminal unit is left untouched and `false` is returned. On
    /// success the unit is terminal immediately: `cancelled` and `finished`
    /// are both set and `executing` was never raised.
    pub fn cancel(&self) -> bool {
        self.bits
            .compare_exchange(0, CANCELLED | FINISHED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// One asynchronous backend action with a uniform lifecycle.
///
/// `perform` must deliver its result to every waiter registered in the
/// coalescing registry; `cancel` must release the same waiters with a
/// cancellation error. Exactly one of the two runs for any unit, and each
/// registered waiter is completed exactly once either way.
#[async_trait::async_trait]
pub trait NetworkOperation: Send + 'static {
    /// Operation type name used in logs and cache-key composition.
    fn name(&self) -> &'static str;

    /// Runs the request and fans the result out to registered callbacks.
    async fn perform(self: Box<Self>);

    /// Releases registered callbacks with a cancellation result, without
    /// performing the request.
    async fn cancel(self: Box<Self>);
}

/// A unit of work: a [`NetworkOperation`] bound to its cache key and
/// lifecycle state.
pub struct WorkItem {
    cache_key: CacheKey,
    state: Arc<WorkState>,
    operation: Box<dyn NetworkOperation>,
}

impl WorkItem {
    /// Wraps `operation` into a pending unit identified by `cache_key`.
    pub fn new(cache_key: CacheKey, operation: Box<dyn NetworkOperation>) -> Self {
        Self {
            cache_key,
            state: Arc::new(WorkState::new()),
            operation,
        }
    }

    /// Handle to the unit's lifecycle state.
    ///
    /// The handle stays valid after the unit completes and can be used to
    /// cancel the unit before it starts executing.
    pub fn state(&self) -> Arc<WorkState> {
        Arc::clone(&self.state)
    }

    /// Key identifying the logical request this unit serves.
    pub fn cache_key(&self) -> &CacheKey {
        &self.cache_key
    }

    /// Entry point invoked by the runner.
    ///
    /// Idempotent per unit: when the pending → executing transition fails the
    /// operation body is not run. A unit cancelled before start still drains
    /// its waiters with a cancellation result, with no other side effects.
    pub(crate) async fn run(self) {
        if !self.state.try_start() {
            if self.state.is_cancelled() {
                debug!(key = %self.cache_key, "unit cancelled before start, releasing waiters");
                self.operation.cancel().await;
            }
            return;
        }

        self.operation.perform().await;
        self.state.finish();
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("cache_key", &self.cache_key)
            .field("name", &self.operation.name())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct RecordingOperation {
        performed: Arc<AtomicUsize>,
        cancelled: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl NetworkOperation for RecordingOperation {
        fn name(&self) -> &'static str {
            "Recording"
        }

        async fn perform(self: Box<Self>) {
            self.performed.fetch_add(1, Ordering::SeqCst);
        }

        async fn cancel(self: Box<Self>) {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recording_unit() -> (WorkItem, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let performed = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicUsize::new(0));
        let operation = RecordingOperation {
            performed: Arc::clone(&performed),
            cancelled: Arc::clone(&cancelled),
        };
        let unit = WorkItem::new(CacheKey::new("Recording", "k"), Box::new(operation));
        (unit, performed, cancelled)
    }

    #[test]
    fn test_fresh_state_is_pending() {
        let state = WorkState::new();
        assert!(!state.is_executing());
        assert!(!state.is_finished());
        assert!(!state.is_cancelled());
    }

    #[test]
    fn test_start_transition_happens_once() {
        let state = WorkState::new();
        assert!(state.try_start());
        assert!(!state.try_start());
        assert!(state.is_executing());
    }

    #[test]
    fn test_finished_is_never_set_while_executing() {
        let state = WorkState::new();
        assert!(state.try_start());
        assert!(state.finish());

        // Both bits changed in one store: the terminal state must show
        // finished without executing.
        assert!(state.is_finished());
        assert!(!state.is_executing());
    }

    #[test]
    fn test_cancel_before_start_is_terminal() {
        let state = WorkState::new();
        assert!(state.cancel());
        assert!(state.is_cancelled());
        assert!(state.is_finished());
        assert!(!state.is_executing());
        assert!(!state.try_start());
    }

    #[test]
    fn test_cancel_after_start_is_rejected() {
        let state = WorkState::new();
        assert!(state.try_start());
        assert!(!state.cancel());
        assert!(!state.is_cancelled());
    }

    #[tokio::test]
    async fn test_run_performs_and_finishes() {
        let (unit, performed, cancelled) = recording_unit();
        let state = unit.state();

        unit.run().await;

        assert_eq!(performed.load(Ordering::SeqCst), 1);
        assert_eq!(cancelled.load(Ordering::SeqCst), 0);
        assert!(state.is_finished());
        assert!(!state.is_executing());
    }

    #[tokio::test]
    async fn test_run_after_cancel_releases_waiters_only() {
        let (unit, performed, cancelled) = recording_unit();
        let state = unit.state();
        assert!(state.cancel());

        unit.run().await;

        assert_eq!(performed.load(Ordering::SeqCst), 0);
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
        assert!(state.is_finished());
    }
}
