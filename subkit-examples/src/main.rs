//! Demo: the coalescing SDK wired against in-process stub collaborators.
//!
//! Fires several concurrent requests for the same logical operations and
//! prints how many calls actually reached the (stubbed) transport and
//! catalog.

use clap::Parser;
use serde_json::json;
use std::collections::BTreeSet;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use subkit::backend::{Backend, Response};
use subkit::catalog::ProductsFetcher;
use subkit::test_utils::{CatalogScript, ScriptedCatalogClient, ScriptedTransport};
use subkit_config::shared::SdkConfig;
use subkit_telemetry::tracing::init_tracing;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// App user id to fetch data for.
    #[arg(long, default_value = "demo-user")]
    app_user_id: String,

    /// Comma-separated product identifiers to look up in the catalog.
    #[arg(long, default_value = "monthly,annual")]
    products: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _log_flusher = init_tracing("subkit-demo")?;

    main_impl().await
}

async fn main_impl() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let config = SdkConfig::new("demo_key");
    config.validate()?;

    info!(user = %args.app_user_id, "starting subkit demo");

    // Stub transport answering slowly enough for concurrent callers to pile
    // up behind one in-flight request.
    let transport = Arc::new(ScriptedTransport::with_delay(Duration::from_millis(200)));
    transport
        .push_response(Ok(Response::ok(json!({
            "original_app_user_id": args.app_user_id,
            "entitlements": {
                "premium": {
                    "product_identifier": "annual",
                    "expires_date": "2030-01-01T00:00:00Z",
                },
            },
            "request_date": "2026-08-06T00:00:00Z",
        }))))
        .await;

    let backend = Arc::new(Backend::new(Arc::clone(&transport), &config.backend));

    // Three independent code paths asking for the same snapshot at once.
    let (first, second, third) = tokio::join!(
        backend.get_customer_info(&args.app_user_id, false),
        backend.get_customer_info(&args.app_user_id, false),
        backend.get_customer_info(&args.app_user_id, false),
    );

    let info = first?;
    second?;
    third?;
    info!(
        user = %info.original_app_user_id,
        entitlements = info.entitlements.len(),
        transport_calls = transport.perform_count(),
        "three concurrent fetches collapsed into one backend call"
    );

    // Catalog lookups: the second round is answered from the per-identifier
    // cache without touching the catalog again.
    let identifiers: BTreeSet<String> =
        args.products.split(',').map(|id| id.trim().to_string()).collect();

    let catalog = Arc::new(ScriptedCatalogClient::with_scripts([
        CatalogScript::Respond {
            delay: Duration::from_millis(100),
        },
    ]));
    let fetcher = ProductsFetcher::new(Arc::clone(&catalog), &config.catalog);

    let products = fetcher.products(identifiers.clone()).await?;
    for product in &products {
        info!(
            identifier = %product.identifier,
            price_micros = product.price_amount_micros,
            currency = %product.currency_code,
            "product fetched from catalog"
        );
    }

    let cached = fetcher.products(identifiers).await?;
    info!(
        products = cached.len(),
        catalog_calls = catalog.request_count(),
        "second lookup answered from cache"
    );

    Ok(())
}
