use std::panic::Location;
use std::path::{Path, PathBuf};

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting failed validation. `section` is the TOML table it lives in.
    #[error("Invalid [{section}] setting: {message} {location}")]
    Invalid {
        section: &'static str,
        message: String,
        location: ErrorLocation,
    },

    #[error("Failed to access {path}: {source} {location}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Config file {path} is not valid TOML: {source} {location}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
        location: ErrorLocation,
    },

    #[error("Failed to serialize config: {source} {location}")]
    Serialize {
        #[source]
        source: toml::ser::Error,
        location: ErrorLocation,
    },

    #[error("Cannot locate the user's home directory")]
    NoHomeDir,
}

impl ConfigError {
    #[track_caller]
    fn invalid(section: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            section,
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::invalid("backend", message)
    }

    #[track_caller]
    pub fn startup(message: impl Into<String>) -> Self {
        Self::invalid("startup", message)
    }

    #[track_caller]
    pub fn logging(message: impl Into<String>) -> Self {
        Self::invalid("logging", message)
    }

    #[track_caller]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn parse(path: &Path, source: toml::de::Error) -> Self {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<toml::ser::Error> for ConfigError {
    #[track_caller]
    fn from(source: toml::ser::Error) -> Self {
        ConfigError::Serialize {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type ConfigErrorResult<T> = Result<T, ConfigError>;
