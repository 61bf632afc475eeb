//! Logging setup
//!
//! Installs a global `tracing` subscriber for hosts that do not bring their
//! own. `RUST_LOG` wins over the fallback level.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset and no level is given.
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn fallback_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => DEFAULT_LOG_LEVEL,
    }
}

/// Install the fmt subscriber. Returns `false` if one was already set.
pub fn init_logging(level: &str) -> bool {
    let fallback = fallback_level(level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
