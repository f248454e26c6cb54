//! Privileged operations exposed to the UI collaborator.
//!
//! The UI never reaches the network or spawns processes itself; every
//! call goes through [`ShellBridge`].

use crate::backend::BackendSupervisor;
use crate::status::BackendStatus;

use std::fmt;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

use error_location::ErrorLocation;
use serde::Deserialize;
use serde_json::Value;
use td_config::AppPaths;
use td_gateway::{
    Collection, Gateway, GatewayError, GatewayResult, ProgressEvent, RelayEvents, RelayHandle,
    StreamError, StreamingRelay,
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("{source} {location}")]
    Gateway {
        #[source]
        source: GatewayError,
        location: ErrorLocation,
    },

    #[error("Invalid bridge request: {message} {location}")]
    InvalidRequest {
        message: String,
        location: ErrorLocation,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize bridge response: {message} {location}")]
    Serialize {
        message: String,
        location: ErrorLocation,
        #[source]
        source: serde_json::Error,
    },
}

impl BridgeError {
    #[track_caller]
    fn invalid_request(source: serde_json::Error) -> Self {
        Self::InvalidRequest {
            message: source.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }

    #[track_caller]
    fn serialize(source: serde_json::Error) -> Self {
        Self::Serialize {
            message: source.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }
}

impl From<GatewayError> for BridgeError {
    #[track_caller]
    fn from(source: GatewayError) -> Self {
        Self::Gateway {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Record identifier as sent by the UI: numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(id) => write!(f, "{id}"),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

/// A bridge call as it arrives over IPC: `{"command": "<name>", ...args}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum BridgeRequest {
    QuickTask,
    StartLongTask { task_id: String },

    ListReports,
    CreateReport { report: Value },
    GetReport { id: RecordId },
    UpdateReport { id: RecordId, report: Value },
    DeleteReport { id: RecordId },

    ListTasks,
    CreateTask { task: Value },
    GetTask { id: RecordId },
    UpdateTask { id: RecordId, task: Value },
    DeleteTask { id: RecordId },

    GetAppPaths,
    GetDatabasePath,
    GetBackendStatus,
}

pub struct ShellBridge {
    gateway: Gateway,
    stream_url: String,
    paths: AppPaths,
    supervisor: Arc<BackendSupervisor>,
}

impl ShellBridge {
    pub fn new(
        gateway: Gateway,
        stream_url: impl Into<String>,
        paths: AppPaths,
        supervisor: Arc<BackendSupervisor>,
    ) -> Self {
        Self {
            gateway,
            stream_url: stream_url.into(),
            paths,
            supervisor,
        }
    }

    // =========================================================================
    // Task Triggers
    // =========================================================================

    pub async fn forward_quick_task(&self) -> BridgeResult<Value> {
        logged(self.gateway.quick_task().await)
    }

    pub async fn forward_start_task(&self, task_id: &str) -> BridgeResult<Value> {
        logged(self.gateway.start_long_task(task_id).await)
    }

    // =========================================================================
    // Reports
    // =========================================================================

    pub async fn list_reports(&self) -> BridgeResult<Value> {
        logged(self.gateway.list(Collection::Reports).await)
    }

    pub async fn create_report(&self, report: &Value) -> BridgeResult<Value> {
        logged(self.gateway.create(Collection::Reports, report).await)
    }

    pub async fn get_report(&self, id: &str) -> BridgeResult<Value> {
        logged(self.gateway.get(Collection::Reports, id).await)
    }

    pub async fn update_report(&self, id: &str, report: &Value) -> BridgeResult<Value> {
        logged(self.gateway.update(Collection::Reports, id, report).await)
    }

    pub async fn delete_report(&self, id: &str) -> BridgeResult<Value> {
        logged(self.gateway.delete(Collection::Reports, id).await)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub async fn list_tasks(&self) -> BridgeResult<Value> {
        logged(self.gateway.list(Collection::Tasks).await)
    }

    pub async fn create_task(&self, task: &Value) -> BridgeResult<Value> {
        logged(self.gateway.create(Collection::Tasks, task).await)
    }

    pub async fn get_task(&self, id: &str) -> BridgeResult<Value> {
        logged(self.gateway.get(Collection::Tasks, id).await)
    }

    pub async fn update_task(&self, id: &str, task: &Value) -> BridgeResult<Value> {
        logged(self.gateway.update(Collection::Tasks, id, task).await)
    }

    pub async fn delete_task(&self, id: &str) -> BridgeResult<Value> {
        logged(self.gateway.delete(Collection::Tasks, id).await)
    }

    // =========================================================================
    // Shell Information
    // =========================================================================

    pub fn get_app_paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn get_database_path(&self) -> &Path {
        &self.paths.database
    }

    pub async fn get_backend_status(&self) -> BackendStatus {
        self.supervisor.status().await
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    /// Open the progress channel. Commands issued before it connects are
    /// buffered and flushed in order.
    pub fn open_streaming_channel(&self) -> (RelayHandle, RelayEvents) {
        StreamingRelay::open(self.stream_url.clone())
    }

    /// Callback flavour of [`ShellBridge::open_streaming_channel`].
    pub fn open_streaming_channel_with<M, E>(&self, on_message: M, on_error: E) -> RelayHandle
    where
        M: FnMut(ProgressEvent) + Send + 'static,
        E: FnMut(StreamError) + Send + 'static,
    {
        StreamingRelay::open_with_handlers(self.stream_url.clone(), on_message, on_error)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Parse a raw IPC payload and dispatch it.
    pub async fn dispatch_json(&self, raw: Value) -> BridgeResult<Value> {
        let request: BridgeRequest = serde_json::from_value(raw).map_err(|e| {
            error!("Rejected bridge request: {e}");
            BridgeError::invalid_request(e)
        })?;

        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: BridgeRequest) -> BridgeResult<Value> {
        match request {
            BridgeRequest::QuickTask => self.forward_quick_task().await,
            BridgeRequest::StartLongTask { task_id } => self.forward_start_task(&task_id).await,

            BridgeRequest::ListReports => self.list_reports().await,
            BridgeRequest::CreateReport { report } => self.create_report(&report).await,
            BridgeRequest::GetReport { id } => self.get_report(&id.to_string()).await,
            BridgeRequest::UpdateReport { id, report } => {
                self.update_report(&id.to_string(), &report).await
            }
            BridgeRequest::DeleteReport { id } => self.delete_report(&id.to_string()).await,

            BridgeRequest::ListTasks => self.list_tasks().await,
            BridgeRequest::CreateTask { task } => self.create_task(&task).await,
            BridgeRequest::GetTask { id } => self.get_task(&id.to_string()).await,
            BridgeRequest::UpdateTask { id, task } => self.update_task(&id.to_string(), &task).await,
            BridgeRequest::DeleteTask { id } => self.delete_task(&id.to_string()).await,

            BridgeRequest::GetAppPaths => to_json(self.get_app_paths()),
            BridgeRequest::GetDatabasePath => to_json(self.get_database_path()),
            BridgeRequest::GetBackendStatus => to_json(&self.get_backend_status().await),
        }
    }
}

/// Per-call failures are logged, then returned to the caller only.
fn logged(result: GatewayResult<Value>) -> BridgeResult<Value> {
    result.map_err(|e| {
        error!("Gateway call failed: {e}");
        BridgeError::from(e)
    })
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> BridgeResult<Value> {
    serde_json::to_value(value).map_err(BridgeError::serialize)
}
