use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::backend::transport::{Request, Response, Transport};
use crate::error::{ErrorKind, SubkitResult};
use crate::subkit_error;

/// Transport returning scripted responses while counting invocations.
///
/// Each `perform` call pops the next scripted response in order. The optional
/// delay holds every request open, giving concurrent callers time to register
/// against the same in-flight key before the first one resolves.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<SubkitResult<Response>>>,
    requests: Mutex<Vec<Request>>,
    perform_count: AtomicUsize,
    delay: Duration,
}

impl ScriptedTransport {
    /// Creates a transport that answers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that holds every request open for `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Queues the next response to hand out.
    pub async fn push_response(&self, response: SubkitResult<Response>) {
        self.responses.lock().await.push_back(response);
    }

    /// Number of times `perform` was invoked.
    pub fn perform_count(&self) -> usize {
        self.perform_count.load(Ordering::SeqCst)
    }

    /// Requests seen so far, in arrival order.
    pub async fn performed_requests(&self) -> Vec<Request> {
        self.requests.lock().await.clone()
    }
}

impl Transport for ScriptedTransport {
    fn perform(&self, request: Request) -> impl Future<Output = SubkitResult<Response>> + Send {
        async move {
            self.perform_count.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().await.push(request);

            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }

            let next = self.responses.lock().await.pop_front();
            next.unwrap_or_else(|| {
                Err(subkit_error!(
                    ErrorKind::TransportFailed,
                    "No scripted response left"
                ))
            })
        }
    }
}
