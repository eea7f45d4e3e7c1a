//! Logging setup for hosts.

use tracing_subscriber::EnvFilter;

use crate::config::DEFAULT_LOG_FILTER;

/// Install a global fmt subscriber, honoring `RUST_LOG`.
///
/// Returns `false` if a subscriber was already installed; later calls are no-ops.
pub fn init_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .try_init()
        .is_ok()
}
