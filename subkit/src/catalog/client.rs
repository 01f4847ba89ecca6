use std::collections::BTreeSet;
use std::future::Future;

use crate::error::SubkitResult;
use crate::types::StoreProduct;

/// External product catalog the SDK queries for price and product data.
///
/// The coalescing layer issues at most one in-flight request per identifier
/// set; implementations do not need their own deduplication.
pub trait CatalogClient: Send + Sync + 'static {
    /// Handle type for one in-flight lookup.
    type Handle: CatalogRequestHandle;

    /// Starts one lookup for the given identifier set.
    fn request(&self, identifiers: &BTreeSet<String>) -> Self::Handle;
}

/// Handle for one in-flight catalog lookup.
pub trait CatalogRequestHandle: Send + 'static {
    /// Awaits the catalog response.
    ///
    /// Must be cancel safe: dropping the returned future leaves the handle
    /// usable for [`CatalogRequestHandle::cancel`].
    fn wait(&mut self) -> impl Future<Output = SubkitResult<Vec<StoreProduct>>> + Send;

    /// Abandons the lookup. The catalog may keep processing server side; the
    /// SDK only requires that no response is delivered afterwards.
    fn cancel(self);
}
