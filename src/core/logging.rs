//! Development-time tracing for debugging component trees.
//!
//! Library code emits `tracing` events on every lifecycle transition; this
//! module only wires up a subscriber for binaries and tests. Consumers that
//! install their own subscriber should skip this entirely.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize a tracing subscriber for development logging.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Output goes to stderr in compact
/// format. Calling this twice is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
