//! Events pushed from the shell to the UI collaborator.

use crate::backend::BackendSupervisor;
use crate::status::BackendStatus;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

// Event names (must match the UI's listener constants)
pub const EVENT_BACKEND_READY: &str = "backend-ready";
pub const EVENT_BACKEND_ERROR: &str = "backend-error";
pub const EVENT_BACKEND_STATE_CHANGED: &str = "backend-state-changed";

const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ShellEvent {
    BackendReady(BackendStatus),
    BackendError {
        message: String,
        recovery_hint: String,
    },
    BackendStateChanged(BackendStatus),
}

impl ShellEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ShellEvent::BackendReady(_) => EVENT_BACKEND_READY,
            ShellEvent::BackendError { .. } => EVENT_BACKEND_ERROR,
            ShellEvent::BackendStateChanged(_) => EVENT_BACKEND_STATE_CHANGED,
        }
    }
}

/// Fan-out of shell events. Emitting with no listeners is not an error.
#[derive(Debug, Clone)]
pub struct ShellEvents {
    tx: broadcast::Sender<ShellEvent>,
}

impl Default for ShellEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ShellEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShellEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ShellEvent) {
        info!("Emitting {}", event.name());
        if self.tx.send(event).is_err() {
            debug!("No listeners for shell event");
        }
    }
}

/// Emit `backend-state-changed` for every supervisor state transition.
pub fn forward_state_changes(
    supervisor: Arc<BackendSupervisor>,
    events: ShellEvents,
) -> JoinHandle<()> {
    let mut state_rx = supervisor.subscribe();

    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            debug!("State change detected: {state}");

            let status = supervisor.status().await;
            events.emit(ShellEvent::BackendStateChanged(status));

            if state.is_terminal() {
                break;
            }
        }
    })
}
