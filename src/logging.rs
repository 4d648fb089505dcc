//! Async logging setup
//!
//! File output is JSON with daily rotation, console output stays plain.
//! The returned guard must be kept alive for the life of the program;
//! dropping it flushes buffered lines and stops the writer thread.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber: JSON file layer plus stdout.
///
/// `RUST_LOG` overrides the default `info` filter. `log` macro calls from
/// library code are bridged into the same subscriber.
pub fn setup_logging(service_name: &str, log_dir: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, format!("{}.log", service_name));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(false)
                .with_line_number(false),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false), // Cleaner console output
        )
        .init();

    guard
}
