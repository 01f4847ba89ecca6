use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::transport::{Request, Transport};
use crate::callbacks::{CacheKey, CallbackCache, content_hash};
use crate::error::{ErrorKind, SubkitResult};
use crate::operations::get_customer_info::CustomerInfoCallback;
use crate::operations::work::NetworkOperation;
use crate::subkit_error;
use crate::types::{CustomerInfo, SubscriberAttribute};

/// Options accompanying a receipt post.
#[derive(Debug, Clone, Default)]
pub struct PostReceiptOptions {
    /// Whether the post was triggered by a restore rather than a purchase.
    pub is_restore: bool,
    /// Offering that was presented when the purchase started, if any.
    pub presented_offering_identifier: Option<String>,
    /// Subscriber attributes to sync along with the receipt.
    pub attributes: Vec<SubscriberAttribute>,
}

/// Posts an opaque platform receipt and resolves with the refreshed
/// subscriber snapshot.
///
/// Receipt posts register in the same registry as customer info fetches,
/// since both resolve to a [`CustomerInfo`]; the operation-name prefix in the
/// cache key keeps the two from ever coalescing with each other.
pub struct PostReceiptOperation<T> {
    transport: Arc<T>,
    cache_key: CacheKey,
    body: Value,
    callbacks: CallbackCache<CustomerInfoCallback>,
}

impl<T> PostReceiptOperation<T> {
    pub const NAME: &'static str = "PostReceipt";

    /// Builds the post body for a receipt.
    ///
    /// The body doubles as the coalescing identity (see
    /// [`PostReceiptOperation::cache_key`]), so everything that
    /// distinguishes two logically different posts must be represented here.
    pub fn body(app_user_id: &str, receipt: &[u8], options: &PostReceiptOptions) -> Value {
        let attributes = Value::Object(
            options
                .attributes
                .iter()
                .map(|attribute| {
                    (
                        attribute.key.clone(),
                        json!({
                            "value": attribute.value,
                            "updated_at_ms": attribute.set_time.timestamp_millis(),
                        }),
                    )
                })
                .collect(),
        );

        json!({
            "fetch_token": BASE64.encode(receipt),
            "app_user_id": app_user_id,
            "is_restore": options.is_restore,
            "presented_offering_identifier": options.presented_offering_identifier,
            "attributes": attributes,
        })
    }

    /// Key under which posts of this exact body coalesce.
    ///
    /// Receipt payloads are large and variable, so the individualized part is
    /// a content hash of the rendered body rather than the body itself. JSON
    /// object keys render in sorted order, which keeps the hash stable for
    /// logically identical bodies.
    pub fn cache_key(body: &Value) -> CacheKey {
        CacheKey::new(Self::NAME, content_hash(body.to_string().as_bytes()))
    }

    /// Creates the operation for a prepared body, draining into `callbacks`.
    pub fn new(
        transport: Arc<T>,
        cache_key: CacheKey,
        body: Value,
        callbacks: CallbackCache<CustomerInfoCallback>,
    ) -> Self {
        Self {
            transport,
            cache_key,
            body,
            callbacks,
        }
    }
}

impl<T> PostReceiptOperation<T>
where
    T: Transport,
{
    async fn post(&self) -> SubkitResult<CustomerInfo> {
        let request = Request::post("/receipts", self.body.clone());
        let response = self.transport.perform(request).await?;
        response.decode()
    }
}

#[async_trait::async_trait]
impl<T> NetworkOperation for PostReceiptOperation<T>
where
    T: Transport,
{
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn perform(self: Box<Self>) {
        let result = self.post().await;

        match &result {
            Ok(info) => debug!(user = %info.original_app_user_id, "receipt posted"),
            Err(err) => warn!(error = %err, "receipt post failed"),
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
                    "Receipt post was cancelled"
                )))
            })
            .await;
    }
}
