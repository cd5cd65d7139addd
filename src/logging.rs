use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber: daily-rotated JSON logs on disk plus a
/// human-readable console layer. `RUST_LOG` extends the default
/// `profile_scraper=info` directive.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "profile_scraper.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::from_default_env().add_directive("profile_scraper=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().with_writer(std::io::stdout))
        .init();

    // The non-blocking writer flushes only while its guard lives; leak it
    // so logs keep flowing until process exit
    std::mem::forget(guard);
}
