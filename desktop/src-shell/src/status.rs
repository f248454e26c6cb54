use crate::backend::{BackendError, BackendProcessState};

use serde::Serialize;

const DEFAULT_FAILURE_HINT: &str = "Please check the logs or restart the application.";

/// Last startup or runtime failure, kept for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub message: String,
    pub recovery_hint: &'static str,
}

impl From<&BackendError> for FailureRecord {
    fn from(error: &BackendError) -> Self {
        Self {
            message: error.to_string(),
            recovery_hint: error.recovery_hint(),
        }
    }
}

/// Snapshot returned by `get-backend-status` and carried by shell events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendStatus {
    pub state: BackendProcessState,
    pub base_url: String,
    pub stream_url: Option<String>,
    pub pid: Option<u32>,
    pub is_healthy: bool,
    pub error: Option<String>,
    pub recovery_hint: Option<String>,
}

/// Build a status snapshot.
///
/// The stream URL is only advertised while the backend is healthy; error
/// details only while it is failed.
pub fn build_backend_status(
    state: BackendProcessState,
    base_url: &str,
    stream_url: &str,
    pid: Option<u32>,
    failure: Option<&FailureRecord>,
) -> BackendStatus {
    let is_healthy = state == BackendProcessState::Healthy;

    let (error, recovery_hint) = if state == BackendProcessState::Failed {
        match failure {
            Some(record) => (
                Some(record.message.clone()),
                Some(record.recovery_hint.to_string()),
            ),
            None => (None, Some(DEFAULT_FAILURE_HINT.to_string())),
        }
    } else {
        (None, None)
    };

    BackendStatus {
        state,
        base_url: base_url.to_string(),
        stream_url: is_healthy.then(|| stream_url.to_string()),
        pid,
        is_healthy,
        error,
        recovery_hint,
    }
}
