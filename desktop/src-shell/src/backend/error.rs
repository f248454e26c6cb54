use crate::backend::BackendProcessState;

use std::fmt;
use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use td_config::ConfigError;
use thiserror::Error;

/// How the backend process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// True when the shell itself asked the process to terminate
    pub requested: bool,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend executable not found at {path} {location}")]
    ExecutableNotFound {
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Failed to spawn backend process {path}: {source} {location}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Backend did not report readiness within {timeout_secs}s {location}")]
    StartupTimeout {
        timeout_secs: u64,
        location: ErrorLocation,
    },

    #[error(
        "Backend health check at {endpoint} failed after {attempts} attempts: {last_error} {location}"
    )]
    HealthCheckTimedOut {
        endpoint: String,
        attempts: u32,
        last_error: String,
        location: ErrorLocation,
    },

    #[error("Backend process exited with {exit} {location}")]
    ProcessExitedNonZero {
        exit: ProcessExit,
        location: ErrorLocation,
    },

    #[error("Backend at {endpoint} is inaccessible: {last_error} {location}")]
    BackendInaccessible {
        endpoint: String,
        last_error: String,
        location: ErrorLocation,
    },

    #[error("Backend at {endpoint} stopped answering after startup: {last_error} {location}")]
    ReadinessNotConfirmed {
        endpoint: String,
        last_error: String,
        location: ErrorLocation,
    },

    #[error("Backend was stopped before it became ready {location}")]
    StoppedBeforeReady { location: ErrorLocation },

    #[error("Backend cannot be started from state {state} {location}")]
    NotRestartable {
        state: BackendProcessState,
        location: ErrorLocation,
    },

    #[error("Configuration error: {source} {location}")]
    Config {
        #[source]
        source: ConfigError,
        location: ErrorLocation,
    },

    #[error("HTTP error: {source} {location}")]
    Http {
        #[source]
        source: reqwest::Error,
        location: ErrorLocation,
    },
}

impl BackendError {
    #[track_caller]
    pub(crate) fn executable_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ExecutableNotFound {
            path: path.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn spawn(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Spawn {
            path: path.into(),
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn startup_timeout(timeout_secs: u64) -> Self {
        Self::StartupTimeout {
            timeout_secs,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn health_check_timed_out(endpoint: &str, attempts: u32, last_error: String) -> Self {
        Self::HealthCheckTimedOut {
            endpoint: endpoint.to_string(),
            attempts,
            last_error,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn exited(exit: ProcessExit) -> Self {
        Self::ProcessExitedNonZero {
            exit,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn inaccessible(endpoint: &str, last_error: String) -> Self {
        Self::BackendInaccessible {
            endpoint: endpoint.to_string(),
            last_error,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn readiness_not_confirmed(endpoint: &str, last_error: String) -> Self {
        Self::ReadinessNotConfirmed {
            endpoint: endpoint.to_string(),
            last_error,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn stopped_before_ready() -> Self {
        Self::StoppedBeforeReady {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn not_restartable(state: BackendProcessState) -> Self {
        Self::NotRestartable {
            state,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Whether this error ends the application when it occurs during startup.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NotRestartable { .. })
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::ExecutableNotFound { .. } => {
                "The application installation appears incomplete. \
                   Please reinstall Taskdeck."
            }
            Self::Spawn { .. } => {
                "The backend could not be launched. \
                   Check file permissions in the installation directory."
            }
            Self::StartupTimeout { .. } => {
                "The backend is taking too long to start. \
                   Try restarting the application or check the logs."
            }
            Self::HealthCheckTimedOut { .. } => {
                "The backend started but is not answering requests. \
                   Another application may be using the backend port."
            }
            Self::ProcessExitedNonZero { .. } => {
                "The backend stopped unexpectedly. \
                   Please report this issue with the diagnostic logs."
            }
            Self::BackendInaccessible { .. } => {
                "Development mode expects a backend that is already running. \
                   Start it before launching the shell."
            }
            Self::ReadinessNotConfirmed { .. } => {
                "The backend stopped answering right after it started. \
                   Try restarting the application or check the logs."
            }
            Self::Config { .. } => {
                "Configuration file has invalid settings. \
                   Check the logs for details or delete the config file to use defaults."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<reqwest::Error> for BackendError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        Self::Http {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for BackendError {
    #[track_caller]
    fn from(source: ConfigError) -> Self {
        Self::Config {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
