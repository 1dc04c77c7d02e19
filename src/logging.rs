//! Tracing subscriber setup for binaries and examples.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the application.

use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set, otherwise `level`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a global `fmt` subscriber. Calling it twice is harmless.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_falls_back_to_level() {
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(env_filter("warn").to_string(), "warn");
        }
    }
}
