//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "CODESNAP_LOG";

/// Install a stderr `fmt` subscriber. `CODESNAP_LOG` wins over `verbose`.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
