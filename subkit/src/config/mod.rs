//! Configuration objects for the SDK.
//!
//! This module contains re-exported configurations that are needed by the SDK.

// Re-exports.
pub use subkit_config::shared::*;
