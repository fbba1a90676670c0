//! Diagnostic logging.
//!
//! Stdout is reserved for the single decision document a guard emits, so every
//! event goes to stderr.

use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "HOOKGUARD_LOG";

/// Installs the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing(default_filter: &str) {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .or_else(|| EnvFilter::try_new(default_filter).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .try_init();
}
