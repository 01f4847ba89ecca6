//! Tracing initialization for binaries embedding the SDK.
//!
//! Log output goes through a non-blocking writer so that slow terminals or
//! pipes never stall the async runtime. The returned [`LogFlusher`] must be
//! kept alive for the lifetime of the process; dropping it flushes and stops
//! the background writer thread.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Guard that keeps the non-blocking log writer alive.
///
/// Bind this to a variable in `main` (for example `_log_flusher`) so buffered
/// log lines are flushed when the process exits.
pub struct LogFlusher {
    _guard: WorkerGuard,
}

/// Initializes the global tracing subscriber for the given binary.
///
/// The filter is taken from `RUST_LOG` when set, falling back to `info` for
/// the binary itself and the SDK crates. Returns an error if a global
/// subscriber was already installed.
pub fn init_tracing(app_name: &str) -> anyhow::Result<LogFlusher> {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{app_name}=info,subkit=info")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;

    Ok(LogFlusher { _guard: guard })
}
