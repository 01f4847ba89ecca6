//! Telemetry bootstrap for subkit binaries.

pub mod tracing;
