use std::env;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Terminal output belongs to the reporter, so the console layer only shows
/// errors unless `verbose`; the log file gets `TRACING_LEVEL` (default info).
pub fn init_logger(verbose: bool) -> impl Drop {
    let file_filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let console_filter = if verbose { "debug" } else { "error" };

    let log_file_path =
        env::var("LOG_FILE_PATH").unwrap_or_else(|_| "./logs/mass-unpack.log".to_string());

    let file_appender = tracing_appender::rolling::never("./", log_file_path);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .with_ansi(true)
                .with_filter(EnvFilter::new(console_filter)),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(EnvFilter::new(file_filter)),
        )
        .init();

    debug!("Tracing is configured for stderr and file logging.");

    guard
}
