use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::transport::{Request, Transport};
use crate::callbacks::{CacheKey, Completion};
use crate::error::{ErrorKind, SubkitResult};
use crate::operations::work::NetworkOperation;
use crate::subkit_error;
use crate::types::SubscriberAttribute;

/// Syncs subscriber attributes to the backend.
///
/// Attribute posts are not coalesced: every call carries its own payload and
/// is submitted straight to the runner. The cache key only serves as the
/// unit's identity in logs.
pub struct PostAttributesOperation<T> {
    transport: Arc<T>,
    app_user_id: String,
    attributes: Vec<SubscriberAttribute>,
    completion: Completion<()>,
}

impl<T> PostAttributesOperation<T> {
    pub const NAME: &'static str = "PostAttributes";

    /// Identity of one attributes post. Not used for coalescing.
    pub fn cache_key(app_user_id: &str) -> CacheKey {
        CacheKey::new(Self::NAME, app_user_id)
    }

    /// Creates the operation, completing `completion` when the post settles.
    pub fn new(
        transport: Arc<T>,
        app_user_id: String,
        attributes: Vec<SubscriberAttribute>,
        completion: Completion<()>,
    ) -> Self {
        Self {
            transport,
            app_user_id,
            attributes,
            completion,
        }
    }

    fn body(&self) -> Value {
        let attributes = Value::Object(
            self.attributes
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

        json!({ "attributes": attributes })
    }
}

impl<T> PostAttributesOperation<T>
where
    T: Transport,
{
    async fn post(transport: &T, app_user_id: &str, body: Value) -> SubkitResult<()> {
        let request = Request::post(format!("/subscribers/{}/attributes", app_user_id), body);
        let response = transport.perform(request).await?;

        if !response.is_success() {
            Err(subkit_error!(
                ErrorKind::UnexpectedBackendResponse,
                "Backend rejected the attributes post",
                format!("status {}", response.status)
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl<T> NetworkOperation for PostAttributesOperation<T>
where
    T: Transport,
{
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn perform(self: Box<Self>) {
        let result = Self::post(&self.transport, &self.app_user_id, self.body()).await;

        match &result {
            Ok(()) => {
                debug!(user = %self.app_user_id, count = self.attributes.len(), "attributes posted")
            }
            Err(err) => warn!(user = %self.app_user_id, error = %err, "attributes post failed"),
        }

        (self.completion)(result);
    }

    async fn cancel(self: Box<Self>) {
        (self.completion)(Err(subkit_error!(
            ErrorKind::OperationCanceled,
            "Attributes post was cancelled"
        )));
    }
}
