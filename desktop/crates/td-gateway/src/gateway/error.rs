use std::panic::Location;

use error_location::ErrorLocation;
use reqwest::Method;
use thiserror::Error;

/// Failure of a single forwarded call. Never escalates beyond the caller.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{method} {path} failed: {message} {location}")]
    Transport {
        method: Method,
        path: String,
        message: String,
        location: ErrorLocation,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {path} returned HTTP {status}: {body} {location}")]
    Status {
        method: Method,
        path: String,
        status: u16,
        body: String,
        location: ErrorLocation,
    },

    #[error("{method} {path} rejected before sending: {message} {location}")]
    InvalidRequest {
        method: Method,
        path: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Failed to build HTTP client: {message} {location}")]
    Client {
        message: String,
        location: ErrorLocation,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {path} returned unparseable JSON: {message} {location}")]
    Parse {
        method: Method,
        path: String,
        message: String,
        location: ErrorLocation,
        #[source]
        source: serde_json::Error,
    },
}

impl GatewayError {
    #[track_caller]
    pub(crate) fn transport(method: &Method, path: &str, source: reqwest::Error) -> Self {
        GatewayError::Transport {
            method: method.clone(),
            path: path.to_string(),
            message: source.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }

    #[track_caller]
    pub(crate) fn status(method: &Method, path: &str, status: u16, body: String) -> Self {
        GatewayError::Status {
            method: method.clone(),
            path: path.to_string(),
            status,
            body,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn parse(method: &Method, path: &str, source: serde_json::Error) -> Self {
        GatewayError::Parse {
            method: method.clone(),
            path: path.to_string(),
            message: source.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }

    #[track_caller]
    pub(crate) fn invalid_request(method: &Method, path: &str, message: impl Into<String>) -> Self {
        GatewayError::InvalidRequest {
            method: method.clone(),
            path: path.to_string(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn client(source: reqwest::Error) -> Self {
        GatewayError::Client {
            message: source.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }

    /// True when the backend could not be reached at all.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, GatewayError::Transport { source, .. } if source.is_connect() || source.is_timeout())
    }

    /// HTTP status returned by the backend, if it answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
