//! Tracing initialization.
//!
//! Structured logging via `tracing`, configured once at startup. The
//! `RUST_LOG` environment variable overrides the configured level.

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::RagError;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error).
    pub level: Level,
    /// Emit JSON-structured lines instead of human-readable output.
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
        }
    }
}

/// Install the global subscriber. Safe to call more than once: subsequent
/// calls are no-ops rather than errors, which keeps test setups simple.
pub fn initialize_logging(config: LoggingConfig) -> Result<(), RagError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let result = if config.json_format {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .try_init()
    };

    // An already-installed subscriber is fine.
    let _ = result;
    Ok(())
}
