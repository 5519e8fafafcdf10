//! # Structured Logging Module
//!
//! Tracing bootstrap for applications embedding the router. Safe to call from
//! multiple components; the first caller wins and later calls are no-ops.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with an environment-driven filter
/// (`RUST_LOG`, defaulting to `info`).
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_filter(filter),
        );

        // Embedding applications may have installed their own subscriber.
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized; keeping the existing one");
        }
    });
}
