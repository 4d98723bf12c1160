//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// `level` is an `EnvFilter` directive (a plain level like "info" works);
/// `json` switches to machine-readable output. Calling this more than once
/// is a no-op, which keeps tests that share a process safe.
pub fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
