//! Test utilities for exercising the coalescing layer.
//!
//! Available to integration tests through the `test-utils` feature, mirroring
//! how the collaborator traits are meant to be implemented by real transports
//! and catalogs.

mod catalog;
mod transport;

pub use catalog::{CatalogScript, ScriptedCatalogClient, test_product};
pub use transport::ScriptedTransport;
