//! Configuration for the poll-and-reconcile loop.

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Tunables for probing and reconciliation. All fields have defaults and
/// are overridable at process start via `watchmand` flags.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Interval between poll rounds. Also the round deadline: probes
    /// still in flight when it elapses are abandoned.
    pub poll_interval: Duration,
    /// Timeout for a single probe. Must be shorter than `poll_interval`.
    pub probe_timeout: Duration,
    /// Maximum number of concurrent in-flight probes per round.
    pub max_in_flight: usize,
    /// Consecutive failures before a target transitions to Unhealthy.
    pub failure_threshold: u32,
    /// HTTP path probed on each target instance.
    pub health_path: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(5),
            max_in_flight: 32,
            failure_threshold: 3,
            health_path: "/healthcheck".to_string(),
        }
    }
}

impl WatchConfig {
    /// Check the invariants the control loop relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.probe_timeout >= self.poll_interval {
            return Err(ConfigError::ProbeTimeoutTooLong {
                probe_timeout: self.probe_timeout,
                poll_interval: self.poll_interval,
            });
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroInFlight);
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if !self.health_path.starts_with('/') {
            return Err(ConfigError::InvalidHealthPath(self.health_path.clone()));
        }
        Ok(())
    }
}
