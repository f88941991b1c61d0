//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber
//! - Pick the formatter (pretty for development, JSON for production)
//!
//! `RUST_LOG` overrides the configured level when set.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

pub fn init(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    // A second initialization (tests, embedding) keeps the first subscriber.
    let _ = match format {
        LogFormat::Pretty => subscriber.try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    };
}
