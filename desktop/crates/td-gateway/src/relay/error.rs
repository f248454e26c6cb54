use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors surfaced by a streaming channel.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Malformed progress record: {message} {location}")]
    Parse {
        message: String,
        /// The raw payload, for diagnostics
        raw: String,
        location: ErrorLocation,
        #[source]
        source: serde_json::Error,
    },

    #[error("Streaming transport error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
        #[source]
        source: tungstenite::Error,
    },

    #[error("Failed to encode command: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
        #[source]
        source: serde_json::Error,
    },

    #[error("Streaming channel is closed {location}")]
    Closed { location: ErrorLocation },
}

impl StreamError {
    #[track_caller]
    pub(crate) fn parse(raw: &str, source: serde_json::Error) -> Self {
        StreamError::Parse {
            message: source.to_string(),
            raw: raw.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }

    #[track_caller]
    pub(crate) fn transport(source: tungstenite::Error) -> Self {
        StreamError::Transport {
            message: source.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }

    #[track_caller]
    pub(crate) fn encode(source: serde_json::Error) -> Self {
        StreamError::Encode {
            message: source.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }

    #[track_caller]
    pub(crate) fn closed() -> Self {
        StreamError::Closed {
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
