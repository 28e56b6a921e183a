//! Structured logging bootstrap.
//!
//! Filter precedence:
//! 1) `RUST_LOG`
//! 2) `observability.log_level` from the config file
//! 3) `info`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

const DEFAULT_FILTER: &str = "info";

/// Install the global `tracing` subscriber.
///
/// Safe to call more than once; later calls are ignored. An unusable
/// configured level falls back to the default and is reported through the
/// installed subscriber.
pub fn init(config: &ObservabilityConfig) {
    let (filter, rejected) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, None),
        Err(_) => match configured_filter(&config.log_level) {
            Ok(filter) => (filter, None),
            Err(level) => (EnvFilter::new(DEFAULT_FILTER), Some(level)),
        },
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();

    if let Some(level) = rejected {
        tracing::warn!(
            log_level = %level,
            fallback = DEFAULT_FILTER,
            "Ignoring invalid log level"
        );
    }
}

/// Filter for `observability.log_level`; `Err` carries a level that does not parse.
fn configured_filter(level: &str) -> Result<EnvFilter, String> {
    let level = level.trim();
    if level.is_empty() {
        return Ok(EnvFilter::new(DEFAULT_FILTER));
    }
    EnvFilter::try_new(format!("{level},topic_provisioner={level}")).map_err(|_| level.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_levels_build_filters() {
        for level in ["trace", "debug", "info", "warn", "error", " debug "] {
            assert!(configured_filter(level).is_ok(), "{level}");
        }
        assert!(configured_filter("").is_ok());
    }

    #[test]
    fn test_invalid_level_is_returned_for_reporting() {
        assert_eq!(configured_filter(" loud ").unwrap_err(), "loud");
    }

    #[test]
    fn test_init_with_invalid_level_does_not_panic() {
        init(&ObservabilityConfig {
            log_level: "loud".to_string(),
        });
        init(&ObservabilityConfig::default());
    }
}
