use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::warn;

use crate::backend::transport::{Request, Transport};
use crate::callbacks::{CacheKey, CallbackCache, ResponseCallback, joined_identifiers};
use crate::error::{ErrorKind, SubkitResult};
use crate::operations::work::NetworkOperation;
use crate::subkit_error;
use crate::types::IntroEligibility;

/// Waiter for an intro eligibility result, keyed by product identifier.
pub type EligibilityCallback = ResponseCallback<HashMap<String, IntroEligibility>>;

/// Checks introductory price eligibility for a set of products.
pub struct GetIntroEligibilityOperation<T> {
    transport: Arc<T>,
    app_user_id: String,
    product_ids: BTreeSet<String>,
    cache_key: CacheKey,
    callbacks: CallbackCache<EligibilityCallback>,
}

impl<T> GetIntroEligibilityOperation<T> {
    pub const NAME: &'static str = "GetIntroEligibility";

    /// Key under which eligibility checks coalesce.
    ///
    /// The product set is joined in sorted order, so two checks for the same
    /// user and products derive the same key regardless of how callers
    /// collected the identifiers.
    pub fn cache_key(app_user_id: &str, product_ids: &BTreeSet<String>) -> CacheKey {
        CacheKey::new(
            Self::NAME,
            format!("{} {}", app_user_id, joined_identifiers(product_ids)),
        )
    }

    /// Creates the operation, draining into `callbacks`.
    pub fn new(
        transport: Arc<T>,
        app_user_id: String,
        product_ids: BTreeSet<String>,
        callbacks: CallbackCache<EligibilityCallback>,
    ) -> Self {
        let cache_key = Self::cache_key(&app_user_id, &product_ids);

        Self {
            transport,
            app_user_id,
            product_ids,
            cache_key,
            callbacks,
        }
    }
}

impl<T> GetIntroEligibilityOperation<T>
where
    T: Transport,
{
    async fn fetch(&self) -> SubkitResult<HashMap<String, IntroEligibility>> {
        let body = json!({
            "product_identifiers": self.product_ids.iter().collect::<Vec<_>>(),
        });
        let request = Request::post(
            format!("/subscribers/{}/intro_eligibility", self.app_user_id),
            body,
        );
        let response = self.transport.perform(request).await?;
        response.decode()
    }
}

#[async_trait::async_trait]
impl<T> NetworkOperation for GetIntroEligibilityOperation<T>
where
    T: Transport,
{
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn perform(self: Box<Self>) {
        let result = self.fetch().await;

        if let Err(err) = &result {
            warn!(user = %self.app_user_id, error = %err, "intro eligibility check failed");
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
                    "Intro eligibility check was cancelled"
                )))
            })
            .await;
    }
}
