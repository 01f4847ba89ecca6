//! Consumer-facing entry points over the coalescing core.
//!
//! The [`Backend`] wires identity validation, cache-key derivation, the
//! callback registries, and the bounded-concurrency runner over an opaque
//! [`Transport`]. Higher-level managers (offerings, customer info, purchase
//! flows) call these entry points; the coalescing contract is exactly-once,
//! non-duplicated delivery of the shared result to every caller.

pub mod transport;

pub use transport::{Method, Request, Response, Transport};

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::bail;
use crate::callbacks::{CallbackCache, Completion};
use crate::config::BackendConfig;
use crate::error::{ErrorKind, SubkitResult};
use crate::operations::factory::CacheableOperationFactory;
use crate::operations::get_customer_info::{CustomerInfoCallback, GetCustomerInfoOperation};
use crate::operations::get_intro_eligibility::{EligibilityCallback, GetIntroEligibilityOperation};
use crate::operations::get_offerings::{GetOfferingsOperation, OfferingsCallback};
use crate::operations::post_attributes::PostAttributesOperation;
use crate::operations::post_receipt::{PostReceiptOperation, PostReceiptOptions};
use crate::operations::runner::OperationRunner;
use crate::operations::work::WorkItem;
use crate::subkit_error;
use crate::types::{CustomerInfo, IntroEligibility, Offerings, SubscriberAttribute};

/// Entry points for backend requests, coalescing equivalent concurrent calls.
///
/// Customer info fetches and receipt posts share one registry because both
/// resolve to a [`CustomerInfo`]; offerings and eligibility each have their
/// own. All factories submit to one shared bounded-concurrency runner.
pub struct Backend<T> {
    transport: Arc<T>,
    runner: OperationRunner,
    jitter_max: Duration,
    customer_info_factory: CacheableOperationFactory<CustomerInfoCallback>,
    offerings_factory: CacheableOperationFactory<OfferingsCallback>,
    eligibility_factory: CacheableOperationFactory<EligibilityCallback>,
}

impl<T> Backend<T>
where
    T: Transport,
{
    /// Creates a backend over `transport` with the given configuration.
    pub fn new(transport: Arc<T>, config: &BackendConfig) -> Self {
        let runner = OperationRunner::new(config.max_concurrent_operations);

        Self {
            transport,
            jitter_max: Duration::from_millis(config.jitter_max_ms),
            customer_info_factory: CacheableOperationFactory::new(
                CallbackCache::new(),
                runner.clone(),
            ),
            offerings_factory: CacheableOperationFactory::new(CallbackCache::new(), runner.clone()),
            eligibility_factory: CacheableOperationFactory::new(
                CallbackCache::new(),
                runner.clone(),
            ),
            runner,
        }
    }

    /// Fetches the subscriber snapshot for `app_user_id`, coalescing with
    /// identical in-flight fetches.
    ///
    /// `background` applies the configured random delay so periodic refreshes
    /// from many devices do not synchronize into load spikes.
    pub async fn get_customer_info(
        &self,
        app_user_id: &str,
        background: bool,
    ) -> SubkitResult<CustomerInfo> {
        let (tx, rx) = oneshot::channel();
        self.get_customer_info_with(
            app_user_id,
            background,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .await;

        receive(rx).await
    }

    /// Callback form of [`Backend::get_customer_info`].
    pub async fn get_customer_info_with(
        &self,
        app_user_id: &str,
        background: bool,
        completion: Completion<CustomerInfo>,
    ) {
        // An invalid identity fails fast, before touching the registry, so it
        // never blocks a legitimate subsequent request for the same key.
        let app_user_id = match validated_app_user_id(app_user_id) {
            Ok(app_user_id) => app_user_id,
            Err(err) => {
                completion(Err(err));
                return;
            }
        };

        let callback = CustomerInfoCallback::new(
            GetCustomerInfoOperation::<T>::cache_key(&app_user_id),
            completion,
        );

        let transport = Arc::clone(&self.transport);
        let callbacks = self.customer_info_factory.callbacks().clone();
        self.customer_info_factory
            .create_or_join(callback, self.jitter(background), move || {
                Box::new(GetCustomerInfoOperation::new(
                    transport,
                    app_user_id,
                    callbacks,
                ))
            })
            .await;
    }

    /// Fetches the offerings for `app_user_id`, coalescing with identical
    /// in-flight fetches.
    pub async fn get_offerings(&self, app_user_id: &str) -> SubkitResult<Offerings> {
        let (tx, rx) = oneshot::channel();
        self.get_offerings_with(
            app_user_id,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .await;

        receive(rx).await
    }

    /// Callback form of [`Backend::get_offerings`].
    pub async fn get_offerings_with(&self, app_user_id: &str, completion: Completion<Offerings>) {
        let app_user_id = match validated_app_user_id(app_user_id) {
            Ok(app_user_id) => app_user_id,
            Err(err) => {
                completion(Err(err));
                return;
            }
        };

        let callback = OfferingsCallback::new(
            GetOfferingsOperation::<T>::cache_key(&app_user_id),
            completion,
        );

        let transport = Arc::clone(&self.transport);
        let callbacks = self.offerings_factory.callbacks().clone();
        self.offerings_factory
            .create_or_join(callback, Duration::ZERO, move || {
                Box::new(GetOfferingsOperation::new(
                    transport,
                    app_user_id,
                    callbacks,
                ))
            })
            .await;
    }

    /// Checks introductory price eligibility for `product_ids`, coalescing
    /// checks for the same user and product set.
    pub async fn get_intro_eligibility(
        &self,
        app_user_id: &str,
        product_ids: BTreeSet<String>,
    ) -> SubkitResult<HashMap<String, IntroEligibility>> {
        let (tx, rx) = oneshot::channel();
        self.get_intro_eligibility_with(
            app_user_id,
            product_ids,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .await;

        receive(rx).await
    }

    /// Callback form of [`Backend::get_intro_eligibility`].
    pub async fn get_intro_eligibility_with(
        &self,
        app_user_id: &str,
        product_ids: BTreeSet<String>,
        completion: Completion<HashMap<String, IntroEligibility>>,
    ) {
        let app_user_id = match validated_app_user_id(app_user_id) {
            Ok(app_user_id) => app_user_id,
            Err(err) => {
                completion(Err(err));
                return;
            }
        };

        let callback = EligibilityCallback::new(
            GetIntroEligibilityOperation::<T>::cache_key(&app_user_id, &product_ids),
            completion,
        );

        let transport = Arc::clone(&self.transport);
        let callbacks = self.eligibility_factory.callbacks().clone();
        self.eligibility_factory
            .create_or_join(callback, Duration::ZERO, move || {
                Box::new(GetIntroEligibilityOperation::new(
                    transport,
                    app_user_id,
                    product_ids,
                    callbacks,
                ))
            })
            .await;
    }

    /// Posts an opaque platform receipt, coalescing identical concurrent
    /// posts, and resolves with the refreshed subscriber snapshot.
    pub async fn post_receipt(
        &self,
        app_user_id: &str,
        receipt: &[u8],
        options: PostReceiptOptions,
    ) -> SubkitResult<CustomerInfo> {
        let (tx, rx) = oneshot::channel();
        self.post_receipt_with(
            app_user_id,
            receipt,
            options,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .await;

        receive(rx).await
    }

    /// Callback form of [`Backend::post_receipt`].
    pub async fn post_receipt_with(
        &self,
        app_user_id: &str,
        receipt: &[u8],
        options: PostReceiptOptions,
        completion: Completion<CustomerInfo>,
    ) {
        let app_user_id = match validated_app_user_id(app_user_id) {
            Ok(app_user_id) => app_user_id,
            Err(err) => {
                completion(Err(err));
                return;
            }
        };

        let body = PostReceiptOperation::<T>::body(&app_user_id, receipt, &options);
        let cache_key = PostReceiptOperation::<T>::cache_key(&body);
        let callback = CustomerInfoCallback::new(cache_key.clone(), completion);

        let transport = Arc::clone(&self.transport);
        let callbacks = self.customer_info_factory.callbacks().clone();
        self.customer_info_factory
            .create_or_join(callback, Duration::ZERO, move || {
                Box::new(PostReceiptOperation::new(
                    transport, cache_key, body, callbacks,
                ))
            })
            .await;
    }

    /// Syncs subscriber attributes. Not coalesced: every call posts its own
    /// payload.
    pub async fn post_subscriber_attributes(
        &self,
        app_user_id: &str,
        attributes: Vec<SubscriberAttribute>,
    ) -> SubkitResult<()> {
        let (tx, rx) = oneshot::channel();
        self.post_subscriber_attributes_with(
            app_user_id,
            attributes,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .await;

        receive(rx).await
    }

    /// Callback form of [`Backend::post_subscriber_attributes`].
    pub async fn post_subscriber_attributes_with(
        &self,
        app_user_id: &str,
        attributes: Vec<SubscriberAttribute>,
        completion: Completion<()>,
    ) {
        let app_user_id = match validated_app_user_id(app_user_id) {
            Ok(app_user_id) => app_user_id,
            Err(err) => {
                completion(Err(err));
                return;
            }
        };

        let cache_key = PostAttributesOperation::<T>::cache_key(&app_user_id);
        let operation = PostAttributesOperation::new(
            Arc::clone(&self.transport),
            app_user_id,
            attributes,
            completion,
        );

        self.runner
            .submit(WorkItem::new(cache_key, Box::new(operation)))
            .await;
    }

    /// Waits until every submitted operation has completed.
    pub async fn wait_for_idle(&self) {
        self.runner.wait_for_idle().await;
    }

    fn jitter(&self, background: bool) -> Duration {
        if background { self.jitter_max } else { Duration::ZERO }
    }
}

/// Validates and normalizes an app user id.
///
/// Rejects empty and whitespace-only ids before any registry interaction.
fn validated_app_user_id(app_user_id: &str) -> SubkitResult<String> {
    let trimmed = app_user_id.trim();

    if trimmed.is_empty() {
        bail!(ErrorKind::MissingAppUserId, "App user id is empty");
    }

    Ok(trimmed.to_string())
}

/// Awaits the result a completion will deliver through `rx`.
async fn receive<R>(rx: oneshot::Receiver<SubkitResult<R>>) -> SubkitResult<R> {
    match rx.await {
        Ok(result) => result,
        // Every registered callback fires exactly once; a dropped sender
        // means the runtime was torn down mid-flight.
        Err(_) => Err(subkit_error!(
            ErrorKind::OperationCanceled,
            "Completion was dropped before a result was delivered"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_app_user_id_is_rejected() {
        let err = validated_app_user_id("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingAppUserId);

        let err = validated_app_user_id("   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingAppUserId);
    }

    #[test]
    fn test_app_user_id_is_trimmed() {
        let id = validated_app_user_id("  user-1  ").unwrap();
        assert_eq!(id, "user-1");
    }
}
