//! Tracing setup for the invoker binary.
//!
//! Build tool output is forwarded through `tracing` at info level
//! (see [`crate::io::output`]), so unlike a pure diagnostics setup the default
//! filter keeps `info` for this crate.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn,invoker=info";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn,invoker=info` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=invoker=debug invoker run
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
