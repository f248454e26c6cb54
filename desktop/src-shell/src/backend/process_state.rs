use std::fmt;

use serde::Serialize;

/// Lifecycle of the one supervised backend process.
///
/// Monotonic: `NotStarted -> Starting -> {Healthy | Failed}`, with
/// `Healthy -> Failed` on an unexpected exit. `Stopped` is reachable from
/// every other state and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendProcessState {
    NotStarted,
    Starting,
    Healthy,
    Failed,
    Stopped,
}

impl BackendProcessState {
    pub fn can_transition_to(self, next: Self) -> bool {
        use BackendProcessState::*;

        match (self, next) {
            (Stopped, _) => false,
            (_, Stopped) => true,
            (NotStarted, Starting) => true,
            (Starting, Healthy | Failed) => true,
            (Healthy, Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == BackendProcessState::Stopped
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendProcessState::NotStarted => "not_started",
            BackendProcessState::Starting => "starting",
            BackendProcessState::Healthy => "healthy",
            BackendProcessState::Failed => "failed",
            BackendProcessState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for BackendProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
