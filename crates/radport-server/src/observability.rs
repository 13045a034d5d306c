//! Tracing setup for the server binary.
//!
//! The subscriber is installed once at startup with a reloadable env-filter
//! layer, so the level configured in `[logging]` can be applied after the
//! configuration file has been read without re-initializing the subscriber.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceLock::new();

/// Installs the subscriber with the default `info` level.
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Installs the subscriber. `RUST_LOG` takes precedence over `level` so a
/// developer can override the configured filter per run.
pub fn init_tracing_with_level(level: &str) {
    let base_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let (reload_layer, handle) = reload::Layer::new(base_filter);
    let _ = LOG_RELOAD_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer())
        .try_init();
}

/// Swaps the active level filter, keeping the subscriber in place.
///
/// No-op when tracing was never initialized (some tests skip it).
pub fn apply_logging_level(level: &str) {
    if let Some(handle) = LOG_RELOAD_HANDLE.get() {
        let _ = handle.modify(|f| {
            *f = EnvFilter::new(level);
        });
    }
}
