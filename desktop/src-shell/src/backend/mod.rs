mod error;
mod health;
mod lifecycle;
mod port;
mod process_state;
mod startup;

pub use error::{BackendError, ProcessExit, Result as BackendResult};
pub use health::{HealthCheckAttempt, HealthProber, HealthVerdict, ProbeOutcome, ProbePolicy};
pub use lifecycle::{BackendSupervisor, SupervisorMode, SupervisorSettings, resolve_executable};
pub use port::PortReclaimer;
pub use process_state::BackendProcessState;
pub use startup::{StartupCoordinator, StartupOutcome, watch_backend};

#[cfg(test)]
pub(crate) use port::{parse_lsof, parse_netstat};
