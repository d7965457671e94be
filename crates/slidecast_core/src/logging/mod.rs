//! Logging infrastructure built on the `tracing` ecosystem.
//!
//! Host applications call [`init_tracing`] once at startup; render sessions
//! are traced with a `session_id` field so one encoder run can be followed
//! through the log.

use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber for application-wide logging.
///
/// This sets up a subscriber that:
/// - Respects RUST_LOG environment variable
/// - Falls back to the provided default directive
/// - Outputs to stderr with timestamps
///
/// Should be called once at application startup. Calling it again is a
/// no-op.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .try_init();
}

/// Create a non-blocking file writer with daily rotation.
///
/// Returns the writer plus a guard; the guard must be kept alive for the
/// lifetime of the application or buffered log lines are lost.
pub fn file_writer(logs_dir: impl AsRef<Path>) -> (NonBlocking, WorkerGuard) {
    let appender = tracing_appender::rolling::daily(logs_dir.as_ref(), "slidecast.log");
    tracing_appender::non_blocking(appender)
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_writer_creates_log_file() {
        let dir = tempdir().unwrap();
        {
            let (mut writer, _guard) = file_writer(dir.path());
            use std::io::Write;
            writer.write_all(b"line\n").unwrap();
        }

        // Guard dropped above, buffered output is flushed
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn init_twice_is_harmless() {
        init_tracing("info");
        init_tracing("debug");
    }
}
