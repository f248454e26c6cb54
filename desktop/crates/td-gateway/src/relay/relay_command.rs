use crate::{StreamError, StreamResult};

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;

/// Outbound command on the streaming channel.
///
/// Wire form: `{"type": "start_task", "task_id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayCommand {
    StartTask { task_id: String },
}

impl RelayCommand {
    pub fn start_task(task_id: impl Into<String>) -> Self {
        RelayCommand::StartTask {
            task_id: task_id.into(),
        }
    }

    pub fn task_id(&self) -> &str {
        match self {
            RelayCommand::StartTask { task_id } => task_id,
        }
    }

    pub(crate) fn encode(&self) -> StreamResult<Message> {
        let json = serde_json::to_string(self).map_err(StreamError::encode)?;
        Ok(Message::text(json))
    }
}
