use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_EXECUTABLE, DEFAULT_HEALTH_PATH, DEFAULT_HOST,
    DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STREAM_PATH, LOOPBACK_HOSTS, MIN_PORT,
};

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Host the backend listens on (loopback only)
    pub host: String,
    pub port: u16,
    /// Path answering the health probe
    pub health_path: String,
    /// Path of the streaming progress socket
    pub stream_path: String,
    /// Executable name inside the resources directory, without platform suffix
    pub executable: String,
    /// Upper bound for one forwarded request/response call
    pub request_timeout_secs: u64,
    /// Resource bundle root. Defaults to the directory of the shell executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources_dir: Option<PathBuf>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
            health_path: String::from(DEFAULT_HEALTH_PATH),
            stream_path: String::from(DEFAULT_STREAM_PATH),
            executable: String::from(DEFAULT_EXECUTABLE),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            resources_dir: None,
        }
    }
}

impl BackendSettings {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if !LOOPBACK_HOSTS.contains(&self.host.as_str()) {
            return Err(ConfigError::backend(format!(
                "backend.host must be {} or localhost, got {}",
                DEFAULT_HOST, self.host
            )));
        }

        if self.port < MIN_PORT {
            return Err(ConfigError::backend(format!(
                "backend.port must be >= {}, got {}",
                MIN_PORT, self.port
            )));
        }

        for (name, path) in [
            ("health_path", &self.health_path),
            ("stream_path", &self.stream_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::backend(format!(
                    "backend.{name} must start with '/', got {path}"
                )));
            }
        }

        if self.executable.trim().is_empty() {
            return Err(ConfigError::backend("backend.executable cannot be empty"));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::backend("backend.request_timeout_secs must be > 0"));
        }

        Ok(())
    }

    /// Base address of the request/response surface, e.g. `http://127.0.0.1:8000`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url(), self.health_path)
    }

    pub fn stream_url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.stream_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resource bundle root: configured value, else the shell executable's directory.
    pub fn resolve_resources_dir(&self) -> ConfigErrorResult<PathBuf> {
        if let Some(dir) = &self.resources_dir {
            return Ok(dir.clone());
        }

        let exe = std::env::current_exe()
            .map_err(|e| ConfigError::io(PathBuf::from("<current_exe>"), e))?;
        exe.parent()
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::backend("Cannot determine resources directory"))
    }
}
