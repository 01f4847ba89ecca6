//! End-to-end coalescing behavior of the backend entry points.

use futures::future::join_all;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use subkit::backend::{Backend, Response};
use subkit::callbacks::CallbackCache;
use subkit::config::BackendConfig;
use subkit::error::ErrorKind;
use subkit::operations::get_customer_info::{CustomerInfoCallback, GetCustomerInfoOperation};
use subkit::operations::post_receipt::PostReceiptOptions;
use subkit::operations::{CacheableOperationFactory, OperationRunner};
use subkit::test_utils::ScriptedTransport;
use subkit::types::{IntroEligibility, SubscriberAttribute};

fn test_config() -> BackendConfig {
    BackendConfig {
        max_concurrent_operations: 4,
        jitter_max_ms: 0,
    }
}

fn customer_info_json(user: &str) -> serde_json::Value {
    json!({
        "original_app_user_id": user,
        "entitlements": {},
        "request_date": "2024-06-01T12:00:00Z",
    })
}

fn offerings_json() -> serde_json::Value {
    json!({
        "current_offering_id": "default",
        "all": {
            "default": {
                "identifier": "default",
                "description": "Standard paywall",
                "product_identifiers": ["monthly", "annual"],
            },
        },
    })
}

#[tokio::test]
async fn concurrent_requests_for_one_user_share_one_unit() {
    let transport = Arc::new(ScriptedTransport::with_delay(Duration::from_millis(150)));
    transport
        .push_response(Ok(Response::ok(customer_info_json("user-1"))))
        .await;
    let backend = Arc::new(Backend::new(Arc::clone(&transport), &test_config()));

    let calls = (0..5).map(|_| {
        let backend = Arc::clone(&backend);
        async move { backend.get_customer_info("user-1", false).await }
    });
    let results = join_all(calls).await;

    assert_eq!(transport.perform_count(), 1);
    for result in results {
        assert_eq!(result.unwrap().original_app_user_id, "user-1");
    }
}

#[tokio::test]
async fn sequential_requests_start_fresh_units() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_response(Ok(Response::ok(customer_info_json("user-1"))))
        .await;
    transport
        .push_response(Ok(Response::ok(customer_info_json("user-1"))))
        .await;
    let backend = Backend::new(Arc::clone(&transport), &test_config());

    backend.get_customer_info("user-1", false).await.unwrap();
    backend.get_customer_info("user-1", false).await.unwrap();

    assert_eq!(transport.perform_count(), 2);
}

#[tokio::test]
async fn distinct_users_do_not_coalesce() {
    let transport = Arc::new(ScriptedTransport::with_delay(Duration::from_millis(100)));
    transport
        .push_response(Ok(Response::ok(customer_info_json("user-1"))))
        .await;
    transport
        .push_response(Ok(Response::ok(customer_info_json("user-1"))))
        .await;
    let backend = Arc::new(Backend::new(Arc::clone(&transport), &test_config()));

    let first = {
        let backend = Arc::clone(&backend);
        async move { backend.get_customer_info("user-1", false).await }
    };
    let second = {
        let backend = Arc::clone(&backend);
        async move { backend.get_customer_info("user-2", false).await }
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(transport.perform_count(), 2);
    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[tokio::test]
async fn failure_fans_out_to_all_waiters_in_registration_order() {
    let transport = Arc::new(ScriptedTransport::with_delay(Duration::from_millis(100)));
    transport
        .push_response(Err(subkit::subkit_error!(
            ErrorKind::TransportFailed,
            "Scripted transport failure"
        )))
        .await;
    let backend = Backend::new(Arc::clone(&transport), &test_config());

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut receivers = Vec::new();
    for tag in 0..5 {
        let order = Arc::clone(&order);
        let (tx, rx) = oneshot::channel();
        backend
            .get_customer_info_with(
                "user-1",
                false,
                Box::new(move |result| {
                    order.lock().unwrap().push(tag);
                    let _ = tx.send(result);
                }),
            )
            .await;
        receivers.push(rx);
    }

    for rx in receivers {
        let result = rx.await.unwrap();
        assert_eq!(result.unwrap_err().kind(), ErrorKind::TransportFailed);
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(transport.perform_count(), 1);

    // The key was evicted with the drain: a later call starts fresh instead
    // of merging into the failed batch.
    transport
        .push_response(Ok(Response::ok(customer_info_json("user-1"))))
        .await;
    backend.get_customer_info("user-1", false).await.unwrap();
    assert_eq!(transport.perform_count(), 2);
}

#[tokio::test]
async fn missing_app_user_id_fails_fast_without_touching_the_registry() {
    let transport = Arc::new(ScriptedTransport::new());
    let backend = Backend::new(Arc::clone(&transport), &test_config());

    let err = backend.get_customer_info("   ", false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingAppUserId);
    assert_eq!(transport.perform_count(), 0);

    // A legitimate request afterwards is unaffected.
    transport
        .push_response(Ok(Response::ok(customer_info_json("user-1"))))
        .await;
    backend.get_customer_info("user-1", false).await.unwrap();
    assert_eq!(transport.perform_count(), 1);
}

#[tokio::test]
async fn identical_receipt_posts_coalesce_on_content_hash() {
    let transport = Arc::new(ScriptedTransport::with_delay(Duration::from_millis(100)));
    transport
        .push_response(Ok(Response::ok(customer_info_json("user-1"))))
        .await;
    let backend = Arc::new(Backend::new(Arc::clone(&transport), &test_config()));

    let posts = (0..2).map(|_| {
        let backend = Arc::clone(&backend);
        async move {
            backend
                .post_receipt("user-1", b"receipt-bytes", PostReceiptOptions::default())
                .await
        }
    });
    let results = join_all(posts).await;

    assert_eq!(transport.perform_count(), 1);
    for result in results {
        assert!(result.is_ok());
    }

    // A different receipt derives a different key and posts again.
    transport
        .push_response(Ok(Response::ok(customer_info_json("user-1"))))
        .await;
    backend
        .post_receipt("user-1", b"other-receipt", PostReceiptOptions::default())
        .await
        .unwrap();
    assert_eq!(transport.perform_count(), 2);
}

#[tokio::test]
async fn attribute_posts_are_not_coalesced() {
    let transport = Arc::new(ScriptedTransport::with_delay(Duration::from_millis(50)));
    transport.push_response(Ok(Response::ok(json!({})))).await;
    transport.push_response(Ok(Response::ok(json!({})))).await;
    let backend = Arc::new(Backend::new(Arc::clone(&transport), &test_config()));

    let attributes = vec![SubscriberAttribute::new("$email", "ada@example.com")];
    let first = {
        let backend = Arc::clone(&backend);
        let attributes = attributes.clone();
        async move {
            backend
                .post_subscriber_attributes("user-1", attributes)
                .await
        }
    };
    let second = {
        let backend = Arc::clone(&backend);
        let attributes = attributes.clone();
        async move {
            backend
                .post_subscriber_attributes("user-1", attributes)
                .await
        }
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(transport.perform_count(), 2);
    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[tokio::test]
async fn eligibility_checks_coalesce_on_user_and_sorted_product_set() {
    let transport = Arc::new(ScriptedTransport::with_delay(Duration::from_millis(100)));
    transport
        .push_response(Ok(Response::ok(json!({
            "monthly": "eligible",
            "annual": "unknown",
        }))))
        .await;
    let backend = Arc::new(Backend::new(Arc::clone(&transport), &test_config()));

    let checks = (0..2).map(|_| {
        let backend = Arc::clone(&backend);
        async move {
            let products: BTreeSet<String> =
                ["monthly", "annual"].map(String::from).into();
            backend.get_intro_eligibility("user-1", products).await
        }
    });
    let results = join_all(checks).await;

    assert_eq!(transport.perform_count(), 1);
    for result in results {
        let eligibility = result.unwrap();
        assert_eq!(eligibility["monthly"], IntroEligibility::Eligible);
        assert_eq!(eligibility["annual"], IntroEligibility::Unknown);
    }
}

#[tokio::test]
async fn customer_info_and_offerings_requests_stay_separate() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_response(Ok(Response::ok(customer_info_json("user-1"))))
        .await;
    transport
        .push_response(Ok(Response::ok(offerings_json())))
        .await;
    let backend = Backend::new(Arc::clone(&transport), &test_config());

    let info = backend.get_customer_info("user-1", false).await.unwrap();
    let offerings = backend.get_offerings("user-1").await.unwrap();

    assert_eq!(transport.perform_count(), 2);
    assert_eq!(info.original_app_user_id, "user-1");
    assert_eq!(offerings.current().unwrap().identifier, "default");

    let requests = transport.performed_requests().await;
    assert_eq!(requests[0].path, "/subscribers/user-1");
    assert_eq!(requests[1].path, "/subscribers/user-1/offerings");
}

#[tokio::test]
async fn unit_cancelled_before_start_releases_its_waiter() {
    let transport = Arc::new(ScriptedTransport::with_delay(Duration::from_millis(150)));
    transport
        .push_response(Ok(Response::ok(customer_info_json("blocker"))))
        .await;

    // A runner with one permit so the second unit stays queued.
    let runner = OperationRunner::new(1);
    let callbacks: CallbackCache<CustomerInfoCallback> = CallbackCache::new();
    let factory = CacheableOperationFactory::new(callbacks.clone(), runner.clone());

    let make_operation = |user: &str| {
        let transport = Arc::clone(&transport);
        let callbacks = callbacks.clone();
        let user = user.to_string();
        move || {
            Box::new(GetCustomerInfoOperation::new(transport, user, callbacks))
                as Box<dyn subkit::operations::NetworkOperation>
        }
    };

    let (blocker_tx, blocker_rx) = oneshot::channel();
    let blocker = CustomerInfoCallback::new(
        GetCustomerInfoOperation::<ScriptedTransport>::cache_key("blocker"),
        Box::new(move |result| {
            let _ = blocker_tx.send(result);
        }),
    );
    factory
        .create_or_join(blocker, Duration::ZERO, make_operation("blocker"))
        .await
        .expect("first registration starts a unit");

    let (tx, rx) = oneshot::channel();
    let queued = CustomerInfoCallback::new(
        GetCustomerInfoOperation::<ScriptedTransport>::cache_key("user-1"),
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );
    let state = factory
        .create_or_join(queued, Duration::ZERO, make_operation("user-1"))
        .await
        .expect("first registration starts a unit");

    assert!(state.cancel());
    assert!(state.is_finished());
    assert!(!state.is_executing());

    let result = rx.await.unwrap();
    assert_eq!(result.unwrap_err().kind(), ErrorKind::OperationCanceled);

    blocker_rx.await.unwrap().unwrap();
    runner.wait_for_idle().await;

    // Only the blocker ever reached the transport.
    assert_eq!(transport.perform_count(), 1);
}
