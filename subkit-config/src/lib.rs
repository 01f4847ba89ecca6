//! Configuration types for the subkit SDK.
//!
//! The types in this crate are shared between the SDK library and the example
//! binaries, so that both sides agree on defaults and validation rules.

pub mod shared;
