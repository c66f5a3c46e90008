//! Logging bootstrap.
//!
//! The library itself only emits `tracing` events; this module is the one
//! place a front end (the CLI, a host shim, tests) turns those events into
//! output. Console logging is always installed; pass a directory to also
//! mirror events into a daily-rotated `translayer.log` through a
//! non-blocking appender.

use std::path::Path;

use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// # Arguments
///
/// * `filter` - Default filter directive (e.g. `"info"`,
///   `"translayer=debug"`); the `RUST_LOG` environment variable
///   overrides it.
/// * `log_dir` - When set, events are also appended to
///   `<log_dir>/translayer.log.<date>`.
///
/// Returns the appender guard; hold it for as long as file logging
/// should keep flushing. Calling this twice is tolerated (the second
/// call is a no-op), which keeps tests that race to initialize happy.
pub fn init(filter: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));
    let timer = LocalTime::new(Rfc3339);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "translayer.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_timer(timer.clone()),
                )
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_timer(timer),
                )
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_timer(timer))
                .try_init();
            None
        }
    }
}
