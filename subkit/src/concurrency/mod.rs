//! Concurrency utilities underlying the coalescing layer.
//!
//! The SDK keeps its shared mutable state (the callback registry and the
//! per-identifier product cache) behind single serialized interfaces; the
//! helpers here cover what those interfaces cannot express directly, such as
//! racing a request against a wall-clock budget.

pub mod timer;
