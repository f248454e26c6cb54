//! Configuration and application data paths for the taskdeck desktop shell.

mod app_paths;
mod backend_settings;
mod config;
mod error;
mod launch_mode;
mod logging_settings;
mod startup_settings;

#[cfg(test)]
mod tests;

pub use app_paths::AppPaths;
pub use backend_settings::BackendSettings;
pub use config::{CONFIG_FILENAME, CONFIG_VERSION, ShellConfig};
pub use error::{ConfigError, ConfigErrorResult};
pub use launch_mode::LaunchMode;
pub use logging_settings::LoggingSettings;
pub use startup_settings::StartupSettings;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_HEALTH_PATH: &str = "/api/quick-task";
const DEFAULT_STREAM_PATH: &str = "/ws";
const DEFAULT_EXECUTABLE: &str = "api";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_HEALTH_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_HEALTH_INTERVAL_MS: u64 = 1000;
const DEFAULT_HEALTH_REQUEST_TIMEOUT_MS: u64 = 2000;
const DEFAULT_READINESS_MARKER: &str = "Application startup complete";

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_RETENTION: usize = 7;

const MIN_PORT: u16 = 1024;
const LOOPBACK_HOSTS: [&str; 2] = [DEFAULT_HOST, "localhost"];
