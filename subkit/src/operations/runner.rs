use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::debug;

use crate::operations::work::WorkItem;

/// Internal state for [`OperationRunner`].
struct RunnerInner {
    /// Owns all spawned unit tasks.
    join_set: JoinSet<()>,
}

/// Bounded-concurrency runner for [`WorkItem`]s.
///
/// The runner executes units on the tokio pool, never more than the
/// configured number at a time. It is agnostic to coalescing, which must
/// happen strictly before submission. Clones share the same runner.
#[derive(Clone)]
pub struct OperationRunner {
    inner: Arc<Mutex<RunnerInner>>,
    permits: Arc<Semaphore>,
}

impl OperationRunner {
    /// Creates a runner executing at most `max_concurrency` units at a time.
    pub fn new(max_concurrency: usize) -> Self {
        let inner = RunnerInner {
            join_set: JoinSet::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            permits: Arc::new(Semaphore::new(max_concurrency)),
        }
    }

    /// Submits a unit for execution.
    ///
    /// Returns as soon as the unit is spawned; execution starts once a
    /// concurrency permit is available. A unit cancelled while still queued
    /// only releases its waiters when dequeued.
    pub async fn submit(&self, work: WorkItem) {
        self.spawn_unit(work, Duration::ZERO).await;
    }

    /// Submits a unit after a uniformly random delay in `[0, max_jitter)`.
    ///
    /// Background-triggered fetches use this to keep periodic refreshes from
    /// many devices from synchronizing into load spikes. A zero `max_jitter`
    /// submits immediately.
    pub async fn submit_with_jitter(&self, work: WorkItem, max_jitter: Duration) {
        let delay = if max_jitter.is_zero() {
            Duration::ZERO
        } else {
            max_jitter.mul_f64(rand::random::<f64>())
        };

        self.spawn_unit(work, delay).await;
    }

    /// Waits until every submitted unit has completed.
    ///
    /// Mainly useful in tests and during teardown.
    pub async fn wait_for_idle(&self) {
        loop {
            let result = {
                let mut inner = self.inner.lock().await;
                inner.join_set.join_next().await
            };

            if result.is_none() {
                // The join set is empty, all units have completed.
                break;
            }
        }
    }

    async fn spawn_unit(&self, work: WorkItem, delay: Duration) {
        let permits = Arc::clone(&self.permits);

        let mut inner = self.inner.lock().await;

        // Reap finished tasks opportunistically so the join set does not grow
        // without bound over the lifetime of the runner.
        while inner.join_set.try_join_next().is_some() {}

        debug!(key = %work.cache_key(), delay = ?delay, "submitting unit of work");

        inner.join_set.spawn(async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }

            // The semaphore is never closed while the runner is alive.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };

            work.run().await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::CacheKey;
    use crate::operations::work::NetworkOperation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct GaugedOperation {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        cancelled: Arc<AtomicUsize>,
        hold: Duration,
    }

    #[async_trait::async_trait]
    impl NetworkOperation for GaugedOperation {
        fn name(&self) -> &'static str {
            "Gauged"
        }

        async fn perform(self: Box<Self>) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            sleep(self.hold).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
        }

        async fn cancel(self: Box<Self>) {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Gauges {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        cancelled: Arc<AtomicUsize>,
    }

    impl Gauges {
        fn new() -> Self {
            Self {
                running: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
                cancelled: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn unit(&self, tag: usize, hold: Duration) -> WorkItem {
            let operation = GaugedOperation {
                running: Arc::clone(&self.running),
                peak: Arc::clone(&self.peak),
                cancelled: Arc::clone(&self.cancelled),
                hold,
            };
            WorkItem::new(
                CacheKey::new("Gauged", tag.to_string()),
                Box::new(operation),
            )
        }
    }

    #[tokio::test]
    async fn test_concurrency_stays_within_bound() {
        let runner = OperationRunner::new(2);
        let gauges = Gauges::new();

        for tag in 0..6 {
            runner
                .submit(gauges.unit(tag, Duration::from_millis(20)))
                .await;
        }
        runner.wait_for_idle().await;

        assert!(gauges.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(gauges.running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_unit_is_not_performed() {
        let runner = OperationRunner::new(1);
        let gauges = Gauges::new();

        // Occupy the single permit so the second unit stays queued long
        // enough to be cancelled before start.
        runner
            .submit(gauges.unit(0, Duration::from_millis(100)))
            .await;

        let queued = gauges.unit(1, Duration::ZERO);
        let state = queued.state();
        runner.submit(queued).await;

        assert!(state.cancel());
        runner.wait_for_idle().await;

        assert_eq!(gauges.cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(gauges.peak.load(Ordering::SeqCst), 1);
        assert!(state.is_finished());
        assert!(!state.is_executing());
    }

    #[tokio::test]
    async fn test_jitter_delays_stay_within_bound() {
        let runner = OperationRunner::new(4);
        let gauges = Gauges::new();

        let started = tokio::time::Instant::now();
        runner
            .submit_with_jitter(gauges.unit(0, Duration::ZERO), Duration::from_millis(50))
            .await;
        runner.wait_for_idle().await;

        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
