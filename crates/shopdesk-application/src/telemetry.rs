//! Tracing initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const FALLBACK_FILTER: &str = "info";

/// Installs the global subscriber with `filter` (an `EnvFilter` directive
/// such as `"shopdesk_api=debug,info"`). A malformed directive falls back to
/// `info`. Calling it twice is harmless.
pub fn init_tracing(filter: &str) {
    let filter = parse_filter(filter);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

fn parse_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{directive}': {e}; using '{FALLBACK_FILTER}'");
        EnvFilter::new(FALLBACK_FILTER)
    })
}
