//! Logging initialization and configuration.
//!
//! The supervisor emits `tracing` events only; installing a subscriber is
//! left to the embedding program. These helpers install a compact `fmt`
//! subscriber for programs that have no setup of their own.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Filter used when neither an explicit level nor `RUST_LOG` is usable.
pub const DEFAULT_FILTER: &str = "deputy=info";

/// Resolve the subscriber filter.
///
/// Priority: `directives` > `RUST_LOG` > [`DEFAULT_FILTER`]. Directives that
/// fail to parse fall through to the next source.
pub fn filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn install(filter: EnvFilter) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_target(true))
        .try_init()
}

/// Install the subscriber, filtered by `RUST_LOG`.
///
/// # Panics
///
/// Panics if a global subscriber is already set.
pub fn init() {
    if let Err(e) = try_init() {
        panic!("failed to install deputy log subscriber: {}", e);
    }
}

/// Install the subscriber, filtered by `RUST_LOG`.
///
/// Returns `Err` if a global subscriber is already set.
pub fn try_init() -> Result<(), TryInitError> {
    install(filter(None))
}

/// Install the subscriber with explicit filter directives.
pub fn try_init_with(directives: &str) -> Result<(), TryInitError> {
    install(filter(Some(directives)))
}

/// Install the subscriber with the level from a loaded [`Config`].
pub fn try_init_from(config: &Config) -> Result<(), TryInitError> {
    try_init_with(config.log_filter())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_directives_win() {
        let filter = filter(Some("deputy=trace"));
        assert_eq!(filter.to_string(), "deputy=trace");
    }

    #[test]
    fn test_invalid_directives_fall_back() {
        // Whatever RUST_LOG holds, the unparseable value is never used.
        let filter = filter(Some("deputy=[unclosed"));
        assert_ne!(filter.to_string(), "deputy=[unclosed");
    }

    #[test]
    fn test_repeated_init_does_not_panic() {
        let _ = try_init();
        let _ = try_init_with("deputy=debug");
        let _ = try_init_from(&Config::default());

        tracing::debug!(stream = "stdout", "log line after init");
    }
}
