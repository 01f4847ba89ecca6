use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

use crate::catalog::client::{CatalogClient, CatalogRequestHandle};
use crate::concurrency::timer::Deadline;
use crate::config::CatalogConfig;
use crate::error::{ErrorKind, SubkitResult};
use crate::subkit_error;
use crate::types::StoreProduct;

/// Completion invoked with the shared result of a catalog lookup.
pub type ProductsCallback = Box<dyn FnOnce(SubkitResult<Vec<StoreProduct>>) + Send>;

/// Internal storage for [`ProductsFetcher`].
///
/// Both maps are only reached through the fetcher mutex.
struct FetcherInner {
    /// Last known successful result per identifier. Merged on every success,
    /// never evicted by in-flight bookkeeping.
    products_by_identifier: HashMap<String, StoreProduct>,
    /// Waiters per in-flight identifier set, in registration order. Presence
    /// of a key is the single "still unresolved" guard that the timeout and
    /// the real completion race for.
    waiters_by_request: HashMap<BTreeSet<String>, Vec<ProductsCallback>>,
}

impl FetcherInner {
    /// Returns the cached products when every requested identifier is
    /// resident, `None` otherwise.
    fn cached_products(&self, identifiers: &BTreeSet<String>) -> Option<Vec<StoreProduct>> {
        identifiers
            .iter()
            .map(|identifier| self.products_by_identifier.get(identifier).cloned())
            .collect()
    }
}

/// Coalescing fetcher for product lookups against an external catalog.
///
/// Lookups coalesce on the exact identifier set: two requests for different,
/// even overlapping, sets never merge. Successful results merge into a
/// per-identifier cache so a request fully covered by cache answers without
/// entering the in-flight registry. Every lookup races an independent
/// wall-clock timeout; exactly one of timeout and real completion reaches the
/// waiters. Clones share the same state.
pub struct ProductsFetcher<C: CatalogClient> {
    client: Arc<C>,
    request_timeout: Duration,
    inner: Arc<Mutex<FetcherInner>>,
}

impl<C> ProductsFetcher<C>
where
    C: CatalogClient,
{
    /// Creates a fetcher querying `client` with the configured timeout.
    pub fn new(client: Arc<C>, config: &CatalogConfig) -> Self {
        let inner = FetcherInner {
            products_by_identifier: HashMap::new(),
            waiters_by_request: HashMap::new(),
        };

        Self {
            client,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Looks up products for `identifiers` and awaits the shared result.
    pub async fn products(
        &self,
        identifiers: BTreeSet<String>,
    ) -> SubkitResult<Vec<StoreProduct>> {
        let (tx, rx) = oneshot::channel();

        self.products_with(
            identifiers,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .await;

        match rx.await {
            Ok(result) => result,
            // Every registered waiter completes exactly once; a dropped
            // sender means the runtime was torn down mid-flight.
            Err(_) => Err(subkit_error!(
                ErrorKind::OperationCanceled,
                "Catalog lookup was abandoned before a result was delivered"
            )),
        }
    }

    /// Looks up products for `identifiers`, registering `completion` for the
    /// shared result.
    ///
    /// An empty set completes immediately. A set fully resident in the cache
    /// answers from cache without entering the in-flight registry. Otherwise
    /// the completion either joins an in-flight lookup for the same set or
    /// becomes the first waiter of a new one.
    pub async fn products_with(&self, identifiers: BTreeSet<String>, completion: ProductsCallback) {
        if identifiers.is_empty() {
            completion(Ok(Vec::new()));
            return;
        }

        {
            let mut inner = self.inner.lock().await;

            if let Some(cached) = inner.cached_products(&identifiers) {
                debug!(count = cached.len(), "products already cached");
                drop(inner);
                completion(Ok(cached));
                return;
            }

            if let Some(waiters) = inner.waiters_by_request.get_mut(&identifiers) {
                debug!("found existing in-flight products request");
                waiters.push(completion);
                return;
            }

            inner
                .waiters_by_request
                .insert(identifiers.clone(), vec![completion]);
        }

        self.spawn_request(identifiers);
    }

    /// Clears the per-identifier cache, returning the removed identifiers.
    ///
    /// Called when the storefront changes and cached prices may be stale.
    /// In-flight lookups are unaffected.
    pub async fn clear_cached_products(&self) -> BTreeSet<String> {
        let mut inner = self.inner.lock().await;
        let removed: BTreeSet<String> = inner.products_by_identifier.drain().map(|(id, _)| id).collect();

        if !removed.is_empty() {
            debug!(count = removed.len(), "product cache cleared");
        }

        removed
    }

    /// Drives one catalog lookup, racing it against the timeout.
    fn spawn_request(&self, identifiers: BTreeSet<String>) {
        let fetcher = self.clone();

        tokio::spawn(async move {
            let mut handle = fetcher.client.request(&identifiers);
            let mut deadline = Deadline::new(fetcher.request_timeout);
            deadline.arm();

            let response = tokio::select! {
                result = handle.wait() => Some(result),
                _ = &mut deadline => None,
            };

            match response {
                Some(result) => fetcher.resolve(&identifiers, result).await,
                None => {
                    handle.cancel();
                    warn!(timeout = ?fetcher.request_timeout, "products request timed out");
                    let timeout = subkit_error!(
                        ErrorKind::RequestTimedOut,
                        "Catalog request timed out",
                        format!("{:?}", fetcher.request_timeout)
                    );
                    fetcher.resolve(&identifiers, Err(timeout)).await;
                }
            }
        });
    }

    /// Settles the in-flight lookup for `identifiers` with `result`.
    ///
    /// Removing the key from the registry under the lock is the single
    /// already-resolved check: whichever of timeout and completion gets here
    /// first drains the waiters, the loser finds no entry and is a no-op.
    /// Successful results merge into the per-identifier cache before any
    /// waiter runs.
    async fn resolve(&self, identifiers: &BTreeSet<String>, result: SubkitResult<Vec<StoreProduct>>) {
        let waiters = {
            let mut inner = self.inner.lock().await;

            let Some(waiters) = inner.waiters_by_request.remove(identifiers) else {
                return;
            };

            if let Ok(products) = &result {
                for product in products {
                    inner
                        .products_by_identifier
                        .insert(product.identifier.clone(), product.clone());
                }
            }

            waiters
        };

        for waiter in waiters {
            waiter(result.clone());
        }
    }
}

impl<C: CatalogClient> Clone for ProductsFetcher<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            request_timeout: self.request_timeout,
            inner: Arc::clone(&self.inner),
        }
    }
}
