use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::transport::{Request, Transport};
use crate::callbacks::{CacheKey, CallbackCache, ResponseCallback};
use crate::error::{ErrorKind, SubkitResult};
use crate::operations::work::NetworkOperation;
use crate::subkit_error;
use crate::types::Offerings;

/// Waiter for an offerings result.
pub type OfferingsCallback = ResponseCallback<Offerings>;

/// Fetches the offerings configured for one app user.
pub struct GetOfferingsOperation<T> {
    transport: Arc<T>,
    app_user_id: String,
    cache_key: CacheKey,
    callbacks: CallbackCache<OfferingsCallback>,
}

impl<T> GetOfferingsOperation<T> {
    pub const NAME: &'static str = "GetOfferings";

    /// Key under which offerings fetches for `app_user_id` coalesce.
    pub fn cache_key(app_user_id: &str) -> CacheKey {
        CacheKey::new(Self::NAME, app_user_id)
    }

    /// Creates the operation for `app_user_id`, draining into `callbacks`.
    pub fn new(
        transport: Arc<T>,
        app_user_id: String,
        callbacks: CallbackCache<OfferingsCallback>,
    ) -> Self {
        let cache_key = Self::cache_key(&app_user_id);

        Self {
            transport,
            app_user_id,
            cache_key,
            callbacks,
        }
    }
}

impl<T> GetOfferingsOperation<T>
where
    T: Transport,
{
    async fn fetch(&self) -> SubkitResult<Offerings> {
        let request = Request::get(format!("/subscribers/{}/offerings", self.app_user_id));
        let response = self.transport.perform(request).await?;
        response.decode()
    }
}

#[async_trait::async_trait]
impl<T> NetworkOperation for GetOfferingsOperation<T>
where
    T: Transport,
{
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn perform(self: Box<Self>) {
        let result = self.fetch().await;

        match &result {
            Ok(offerings) => {
                debug!(user = %self.app_user_id, count = offerings.all.len(), "offerings fetched")
            }
            Err(err) => warn!(user = %self.app_user_id, error = %err, "offerings fetch failed"),
        }

        self.callbacks
            .perform_on_all_items_and_remove_from_cache(&self.cache_key, |callback| {
                callback.complete(result.clone())
            })
            .await;
    }

    async fn cancel(self: Box<Self>) {
        self.callbacks
            .perform_on_all_items_and_remove_from_cache(&self.cache_key, |callback| {
                callback.complete(Err(subkit_error!(
                    ErrorKind::OperationCanceled,
                    "Offerings fetch was cancelled"
                )))
            })
            .await;
    }
}
