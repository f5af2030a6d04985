//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor an explicit filter is given.
pub const DEFAULT_LOG_FILTER: &str = "hotpush=info";

/// Install a global fmt subscriber.
///
/// Precedence: `RUST_LOG`, then `filter`, then [`DEFAULT_LOG_FILTER`]. Calling
/// this more than once is harmless; later calls leave the first subscriber in
/// place.
pub fn init_logging(filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
