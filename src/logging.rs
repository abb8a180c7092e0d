//! Diagnostic logging setup.
//!
//! Filter comes from `RUST_LOG`, then `UNBLOCK_LOG`, then defaults to `warn`.
//! Logs go to stderr so they never mix with notifications or `--json` output.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("UNBLOCK_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Calling it twice is harmless.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
