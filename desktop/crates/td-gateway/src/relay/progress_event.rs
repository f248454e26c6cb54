use crate::{StreamError, StreamResult};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const TASK_ID_FIELD: &str = "task_id";
const PROGRESS_FIELD: &str = "progress";

/// Progress value at which a task is finished.
pub const COMPLETE_PROGRESS: f64 = 100.0;

/// Inbound record from the backend.
///
/// Opaque apart from `task_id` and the numeric `progress` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressEvent(Map<String, Value>);

impl ProgressEvent {
    pub(crate) fn parse(raw: &str) -> StreamResult<Self> {
        serde_json::from_str(raw)
            .map(ProgressEvent)
            .map_err(|e| StreamError::parse(raw, e))
    }

    pub(crate) fn parse_bytes(raw: &[u8]) -> StreamResult<Self> {
        serde_json::from_slice(raw)
            .map(ProgressEvent)
            .map_err(|e| StreamError::parse(&String::from_utf8_lossy(raw), e))
    }

    pub fn task_id(&self) -> Option<&str> {
        self.0.get(TASK_ID_FIELD).and_then(Value::as_str)
    }

    pub fn progress(&self) -> Option<f64> {
        self.0.get(PROGRESS_FIELD).and_then(Value::as_f64)
    }

    /// True once progress reaches 100. Closing on it is the caller's call.
    pub fn is_complete(&self) -> bool {
        self.progress().is_some_and(|p| p >= COMPLETE_PROGRESS)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for ProgressEvent {
    fn from(fields: Map<String, Value>) -> Self {
        ProgressEvent(fields)
    }
}
