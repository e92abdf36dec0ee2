//! Structured logging initialization.
//!
//! All crates in the workspace emit `tracing` events; the embedding
//! process picks one of these initializers at startup. Filtering is
//! driven by `RUST_LOG`, defaulting to `info` for the whole workspace.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize human-readable logging for interactive use.
///
/// ```no_run
/// beaconnet_core::logging::init();
/// tracing::info!("discovery started");
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize JSON logging for headless deployments feeding a log
/// aggregator.
pub fn init_json() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_without_env() {
        // A subscriber can only be installed once per process, so only the
        // filter construction is exercised here.
        let _ = env_filter();
    }
}
