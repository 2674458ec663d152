//! Logging setup
//!
//! Log lines go to stderr so they never mix with command output or the
//! mapping prompt.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber
///
/// `RUST_LOG` picks the filter and defaults to `warn`. Useful values are
/// `lightstrand=debug` for mapping state changes and socket routing, and
/// `hue=debug` for every bridge request.
pub fn init() -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .map_err(|e| crate::StrandError::Other(format!("Failed to initialize tracing: {}", e)))
}

/// Like [`init`], but ignores an already installed subscriber
pub fn init_test() {
    let _ = init();
}
