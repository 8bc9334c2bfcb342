//! Error types for the Watchman health engine.
//!
//! Probe failures are deliberately not errors — they are classified into
//! `ProbeOutcome` variants. The only fallible surface here is
//! configuration validation at process start.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid health engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "probe timeout {probe_timeout:?} must be shorter than the poll interval {poll_interval:?}"
    )]
    ProbeTimeoutTooLong {
        probe_timeout: Duration,
        poll_interval: Duration,
    },

    #[error("max in-flight probes must be at least 1")]
    ZeroInFlight,

    #[error("failure threshold must be at least 1")]
    ZeroThreshold,

    #[error("health path must start with '/': {0}")]
    InvalidHealthPath(String),
}
