//! Logging configuration using tracing
//!
//! Provides structured logging to stderr and, optionally, a daily-rolling log
//! file, with support for the RUST_LOG environment variable.

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// File name prefix for the rolling log file
pub const LOG_FILE_NAME: &str = "sms-relay.log";

/// Initialize the tracing subscriber
///
/// Sets up structured logging with:
/// - Filtering via RUST_LOG, falling back to the configured level
/// - Formatted output to stderr
/// - Optional daily-rolling file output when `file_dir` is set
///
/// # Example RUST_LOG values
/// - `RUST_LOG=debug` - Show debug and above
/// - `RUST_LOG=sms_relay=trace` - Trace level for the relay crate
/// - `RUST_LOG=sms_relay=debug,termux=info` - Different levels per crate
///
/// Keep the returned guard alive for the life of the process, otherwise
/// buffered file output is lost.
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init(config: &LoggingConfig) -> crate::Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match config.file_dir {
        Some(ref dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::RelayError::Other(format!("Failed to initialize tracing: {}", e)))?;

    Ok(guard)
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init(&LoggingConfig::default());
}
