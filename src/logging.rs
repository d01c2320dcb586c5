//! Logging initialization
//!
//! Console logging honors `RUST_LOG` via the env filter; an optional
//! daily-rotated file layer can be added for long-running hubs.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize console logging
///
/// Defaults to `info` when `RUST_LOG` is unset. Safe to call once at
/// process start.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize console logging plus a daily-rotated log file
///
/// Returns the appender guard; keep it alive for the process lifetime or
/// buffered lines are lost.
pub fn init_with_file(
    log_dir: impl AsRef<std::path::Path>,
) -> tracing_appender::non_blocking::WorkerGuard {
    let appender = tracing_appender::rolling::daily(log_dir, "eden-hub.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    guard
}
