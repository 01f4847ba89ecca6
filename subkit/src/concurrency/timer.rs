//! Arm-on-demand deadline used to race lookups against a wall-clock budget.

use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;
use tokio::time::{Sleep, sleep};

/// A future that stays pending until armed, then resolves once its budget
/// elapses.
///
/// The deadline is inert after construction, which makes it usable as an
/// optional branch of a `tokio::select!`: an unarmed deadline never fires.
/// Arming again replaces any in-flight sleep, so one instance can be reused
/// across attempts. The inner [`Sleep`] is boxed to keep the type `Unpin`
/// and movable into `select!` without extra pinning.
#[derive(Debug)]
pub struct Deadline {
    sleep: Option<Pin<Box<Sleep>>>,
    budget: Duration,
}

impl Deadline {
    /// Creates an unarmed deadline with the given budget.
    pub fn new(budget: Duration) -> Self {
        Self {
            sleep: None,
            budget,
        }
    }

    /// Arms the deadline so it resolves after the configured budget.
    pub fn arm(&mut self) {
        self.sleep = Some(Box::pin(sleep(self.budget)));
    }
}

impl Future for Deadline {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let Some(sleep) = this.sleep.as_mut() else {
            return Poll::Pending;
        };

        ready!(sleep.as_mut().poll(cx));

        Poll::Ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_unarmed_deadline_never_fires() {
        let deadline = Deadline::new(Duration::from_millis(1));
        let result = timeout(Duration::from_millis(50), deadline).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_armed_deadline_fires_after_budget() {
        let mut deadline = Deadline::new(Duration::from_millis(10));
        deadline.arm();
        let result = timeout(Duration::from_secs(5), deadline).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_rearming_resets_the_budget() {
        let mut deadline = Deadline::new(Duration::from_millis(20));
        deadline.arm();
        tokio::time::sleep(Duration::from_millis(10)).await;
        deadline.arm();

        let early = timeout(Duration::from_millis(5), &mut deadline).await;
        assert!(early.is_err());

        let eventual = timeout(Duration::from_secs(5), &mut deadline).await;
        assert!(eventual.is_ok());
    }
}
