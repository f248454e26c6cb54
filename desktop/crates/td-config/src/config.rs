//! Shell configuration with validation, versioning and env overrides.

use crate::{
    BackendSettings, ConfigError, ConfigErrorResult, LaunchMode, LoggingSettings, StartupSettings,
};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration version for migration support.
/// Increment when adding new fields or changing structure.
pub const CONFIG_VERSION: u32 = 1;

pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Config file format version
    pub version: u32,

    /// Standalone (spawn the bundled backend) or attached (development)
    pub mode: LaunchMode,

    pub backend: BackendSettings,

    pub startup: StartupSettings,

    pub logging: LoggingSettings,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            mode: LaunchMode::default(),
            backend: BackendSettings::default(),
            startup: StartupSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ShellConfig {
    /// Load config from `<dir>/config.toml`, creating defaults if it does not exist.
    ///
    /// Loading order:
    /// 1. Parse config.toml if present, else write defaults
    /// 2. Migrate older versions (and persist the migrated file)
    /// 3. Apply TD_* environment variable overrides
    /// 4. Validate
    pub fn load_or_create(dir: &Path) -> ConfigErrorResult<Self> {
        let config_path = dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let mut config = Self::load_toml(&config_path)?;

            if config.version < CONFIG_VERSION {
                config = Self::migrate(config);
                config.save(dir)?;
            }

            config
        } else {
            let config = Self::default();
            config.save(dir)?;
            info!("Wrote default configuration to {}", config_path.display());
            config
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn load_toml(path: &PathBuf) -> ConfigErrorResult<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        toml::from_str(&contents).map_err(|e| ConfigError::parse(path, e))
    }

    /// Save config to file atomically.
    ///
    /// Uses write-to-temp-then-rename so an interrupted write never
    /// leaves a truncated config behind.
    pub fn save(&self, dir: &Path) -> ConfigErrorResult<()> {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))?;

        let config_path = dir.join(CONFIG_FILENAME);
        let content = toml::to_string_pretty(self)?;

        let temp_path = config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content).map_err(|e| ConfigError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::io(&config_path, e))?;

        Ok(())
    }

    /// Migrate config from older version.
    fn migrate(mut config: Self) -> Self {
        // Version 0 -> 1: startup settings introduced
        if config.version == 0 {
            config.startup = StartupSettings::default();
            config.version = 1;
        }

        config
    }

    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.backend.validate()?;
        self.startup.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.mode == LaunchMode::Attached
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!("  mode: {}", self.mode);
        info!(
            "  backend: {} (health {}, stream {}, request timeout {}s)",
            self.backend.base_url(),
            self.backend.health_path,
            self.backend.stream_path,
            self.backend.request_timeout_secs
        );
        info!(
            "  startup: timeout={}s, probe={}x{}ms, marker={:?}",
            self.startup.startup_timeout_secs,
            self.startup.health_max_attempts,
            self.startup.health_interval_ms,
            self.startup.readiness_marker
        );
        info!(
            "  logging: {} (keep {} files)",
            self.logging.level, self.logging.retention_count
        );
    }

    fn apply_env_overrides(&mut self) {
        let mut attached = self.is_attached();
        Self::apply_env_bool("TD_DEV", &mut attached);
        self.mode = if attached {
            LaunchMode::Attached
        } else {
            LaunchMode::Standalone
        };

        // Backend
        Self::apply_env_string("TD_BACKEND_HOST", &mut self.backend.host);
        Self::apply_env_parse("TD_BACKEND_PORT", &mut self.backend.port);
        Self::apply_env_string("TD_BACKEND_EXECUTABLE", &mut self.backend.executable);
        Self::apply_env_parse(
            "TD_REQUEST_TIMEOUT_SECS",
            &mut self.backend.request_timeout_secs,
        );
        Self::apply_env_option_path("TD_RESOURCES_DIR", &mut self.backend.resources_dir);

        // Startup
        Self::apply_env_parse(
            "TD_STARTUP_TIMEOUT_SECS",
            &mut self.startup.startup_timeout_secs,
        );
        Self::apply_env_parse(
            "TD_HEALTH_MAX_ATTEMPTS",
            &mut self.startup.health_max_attempts,
        );
        Self::apply_env_parse(
            "TD_HEALTH_INTERVAL_MS",
            &mut self.startup.health_interval_ms,
        );

        // Logging
        Self::apply_env_string("TD_LOG_LEVEL", &mut self.logging.level);
    }

    /// Helper: Apply environment variable override for String values
    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Helper: Apply environment variable override for bool values (accepts "true"/"1")
    fn apply_env_bool(var_name: &str, target: &mut bool) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val == "true" || val == "1";
        }
    }

    /// Helper: Apply environment variable override for parseable values
    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }

    fn apply_env_option_path(var_name: &str, target: &mut Option<PathBuf>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = Some(PathBuf::from(val));
        }
    }
}
