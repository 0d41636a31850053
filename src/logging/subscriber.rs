//! Tracing subscriber setup
//!
//! Builds the global subscriber from layers:
//!
//! ```text
//! Registry
//!   ├── EnvFilter (RUST_LOG, else the configured level)
//!   ├── Fmt layer -> RotatingFile (text or JSON, no ANSI)
//!   └── Fmt layer -> stdout (only with --console)
//! ```

use super::rotating::RotatingFile;
use super::LoggingError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Record format written to the log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber writing to `sink`
///
/// `level` is used when `RUST_LOG` is not set.
pub fn init_subscriber(
    sink: RotatingFile,
    level: &str,
    format: LogFormat,
    console: bool,
) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let text_layer = (format == LogFormat::Text).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(sink.clone())
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
    });

    let json_layer = (format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(sink.clone())
            .with_target(true)
            .with_thread_ids(true)
    });

    let console_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(console_layer);

    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        LoggingError::Subscriber(format!(
            "Failed to set global subscriber (may already be initialized): {}",
            e
        ))
    })
}
