//! Coalescing layer for external catalog lookups.
//!
//! The catalog is slower and more tightly rate limited than the backend, so
//! its coalescer adds two things the backend path does not have: a
//! per-identifier result cache that can answer fully covered requests without
//! any network traffic, and an independent wall-clock timeout racing every
//! in-flight lookup.

mod client;
mod fetcher;

pub use client::{CatalogClient, CatalogRequestHandle};
pub use fetcher::{ProductsCallback, ProductsFetcher};
