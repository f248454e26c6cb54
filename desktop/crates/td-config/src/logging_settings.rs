use crate::{ConfigError, ConfigErrorResult, DEFAULT_LOG_LEVEL, DEFAULT_LOG_RETENTION};

use serde::{Deserialize, Serialize};

const VALID_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (off, error, warn, info, debug, trace)
    pub level: String,
    /// Number of rotated daily log files to keep
    pub retention_count: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: String::from(DEFAULT_LOG_LEVEL),
            retention_count: DEFAULT_LOG_RETENTION,
        }
    }
}

impl LoggingSettings {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if !VALID_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::logging(format!(
                "logging.level must be one of {:?}, got {}",
                VALID_LEVELS, self.level
            )));
        }

        if self.retention_count == 0 {
            return Err(ConfigError::logging("logging.retention_count must be >= 1"));
        }

        Ok(())
    }
}
