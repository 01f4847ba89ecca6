use std::collections::{BTreeSet, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::catalog::{CatalogClient, CatalogRequestHandle};
use crate::error::{ErrorKind, SubkitResult};
use crate::subkit_error;
use crate::types::StoreProduct;

/// Scripted behavior of one catalog request.
#[derive(Debug, Clone)]
pub enum CatalogScript {
    /// Respond with one product per requested identifier after the delay.
    Respond { delay: Duration },
    /// Fail after the delay.
    Fail { delay: Duration },
    /// Never respond; exercises the timeout path.
    Hang,
}

/// Builds a deterministic product for `identifier`.
pub fn test_product(identifier: &str) -> StoreProduct {
    StoreProduct {
        identifier: identifier.to_string(),
        title: format!("Product {identifier}"),
        price_amount_micros: 990_000,
        currency_code: "USD".to_string(),
    }
}

/// Catalog client following a queue of [`CatalogScript`]s.
///
/// Each request pops the next script; a request beyond the end of the queue
/// responds immediately. Request and cancellation counts are observable for
/// assertions.
#[derive(Default)]
pub struct ScriptedCatalogClient {
    scripts: Mutex<VecDeque<CatalogScript>>,
    request_count: AtomicUsize,
    cancel_count: Arc<AtomicUsize>,
}

impl ScriptedCatalogClient {
    /// Creates a client that answers every request immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client following `scripts` in order.
    pub fn with_scripts(scripts: impl IntoIterator<Item = CatalogScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Number of requests issued so far.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Number of requests that were cancelled.
    pub fn cancel_count(&self) -> usize {
        self.cancel_count.load(Ordering::SeqCst)
    }

    fn next_script(&self) -> CatalogScript {
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CatalogScript::Respond {
                delay: Duration::ZERO,
            })
    }
}

impl CatalogClient for ScriptedCatalogClient {
    type Handle = ScriptedHandle;

    fn request(&self, identifiers: &BTreeSet<String>) -> Self::Handle {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        ScriptedHandle {
            identifiers: identifiers.clone(),
            script: self.next_script(),
            cancel_count: Arc::clone(&self.cancel_count),
        }
    }
}

/// Handle produced by [`ScriptedCatalogClient`].
pub struct ScriptedHandle {
    identifiers: BTreeSet<String>,
    script: CatalogScript,
    cancel_count: Arc<AtomicUsize>,
}

impl CatalogRequestHandle for ScriptedHandle {
    fn wait(&mut self) -> impl Future<Output = SubkitResult<Vec<StoreProduct>>> + Send {
        let identifiers = self.identifiers.clone();
        let script = self.script.clone();

        async move {
            match script {
                CatalogScript::Respond { delay } => {
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    Ok(identifiers
                        .iter()
                        .map(|identifier| test_product(identifier))
                        .collect())
                }
                CatalogScript::Fail { delay } => {
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    Err(subkit_error!(
                        ErrorKind::CatalogRequestFailed,
                        "Scripted catalog failure"
                    ))
                }
                CatalogScript::Hang => std::future::pending().await,
            }
        }
    }

    fn cancel(self) {
        self.cancel_count.fetch_add(1, Ordering::SeqCst);
    }
}
