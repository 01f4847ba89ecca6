use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::transport::{Request, Transport};
use crate::callbacks::{CacheKey, CallbackCache, ResponseCallback};
use crate::error::{ErrorKind, SubkitResult};
use crate::operations::work::NetworkOperation;
use crate::subkit_error;
use crate::types::CustomerInfo;

/// Waiter for a customer info result.
///
/// Shared by [`GetCustomerInfoOperation`] and
/// [`crate::operations::post_receipt::PostReceiptOperation`], which both
/// resolve to a [`CustomerInfo`] snapshot and register in the same registry.
pub type CustomerInfoCallback = ResponseCallback<CustomerInfo>;

/// Fetches the subscriber snapshot for one app user.
pub struct GetCustomerInfoOperation<T> {
    transport: Arc<T>,
    app_user_id: String,
    cache_key: CacheKey,
    callbacks: CallbackCache<CustomerInfoCallback>,
}

impl<T> GetCustomerInfoOperation<T> {
    pub const NAME: &'static str = "GetCustomerInfo";

    /// Key under which fetches for `app_user_id` coalesce.
    pub fn cache_key(app_user_id: &str) -> CacheKey {
        CacheKey::new(Self::NAME, app_user_id)
    }

    /// Creates the operation for `app_user_id`, draining into `callbacks`.
    pub fn new(
        transport: Arc<T>,
        app_user_id: String,
        callbacks: CallbackCache<CustomerInfoCallback>,
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

impl<T> GetCustomerInfoOperation<T>
where
    T: Transport,
{
    async fn fetch(&self) -> SubkitResult<CustomerInfo> {
        let request = Request::get(format!("/subscribers/{}", self.app_user_id));
        let response = self.transport.perform(request).await?;
        response.decode()
    }
}

#[async_trait::async_trait]
impl<T> NetworkOperation for GetCustomerInfoOperation<T>
where
    T: Transport,
{
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn perform(self: Box<Self>) {
        let result = self.fetch().await;

        match &result {
            Ok(_) => debug!(user = %self.app_user_id, "customer info fetched"),
            Err(err) => warn!(user = %self.app_user_id, error = %err, "customer info fetch failed"),
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
                    "Customer info fetch was cancelled"
                )))
            })
            .await;
    }
}
