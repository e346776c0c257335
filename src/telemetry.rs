//! Structured logging setup.
//!
//! The gateway only ever logs to stdout; there is no metrics or trace export
//! pipeline here. `RUST_LOG` controls verbosity the usual way, defaulting to
//! `info` for this crate and `warn` for its dependencies.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global `tracing` subscriber.
///
/// Call once at the start of `main`. Panics if a subscriber is already
/// installed, since that indicates a programming error, not a runtime one.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,x402_gateway=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
