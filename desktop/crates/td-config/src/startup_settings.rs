use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_HEALTH_INTERVAL_MS, DEFAULT_HEALTH_MAX_ATTEMPTS,
    DEFAULT_HEALTH_REQUEST_TIMEOUT_MS, DEFAULT_READINESS_MARKER, DEFAULT_STARTUP_TIMEOUT_SECS,
};

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupSettings {
    /// Bound on waiting for the readiness marker (seconds)
    pub startup_timeout_secs: u64,
    /// Probe ceiling per health-check sequence
    pub health_max_attempts: u32,
    /// Spacing between probe attempts (milliseconds)
    pub health_interval_ms: u64,
    /// Per-request timeout of a single probe (milliseconds)
    pub health_request_timeout_ms: u64,
    /// Literal text the backend prints once it is about to accept traffic
    pub readiness_marker: String,
}

impl Default for StartupSettings {
    fn default() -> Self {
        Self {
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
            health_max_attempts: DEFAULT_HEALTH_MAX_ATTEMPTS,
            health_interval_ms: DEFAULT_HEALTH_INTERVAL_MS,
            health_request_timeout_ms: DEFAULT_HEALTH_REQUEST_TIMEOUT_MS,
            readiness_marker: String::from(DEFAULT_READINESS_MARKER),
        }
    }
}

impl StartupSettings {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.startup_timeout_secs == 0 {
            return Err(ConfigError::startup("startup.startup_timeout_secs must be > 0"));
        }

        if self.health_max_attempts == 0 {
            return Err(ConfigError::startup("startup.health_max_attempts must be >= 1"));
        }

        if self.health_request_timeout_ms == 0 {
            return Err(ConfigError::startup(
                "startup.health_request_timeout_ms must be > 0",
            ));
        }

        if self.readiness_marker.trim().is_empty() {
            return Err(ConfigError::startup("startup.readiness_marker cannot be empty"));
        }

        Ok(())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }

    pub fn health_request_timeout(&self) -> Duration {
        Duration::from_millis(self.health_request_timeout_ms)
    }
}
