//! Single-flight startup sequence and post-startup backend watch.

use crate::backend::{BackendError, BackendResult, BackendSupervisor, HealthVerdict, PortReclaimer};
use crate::events::{ShellEvent, ShellEvents};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOutcome {
    /// The backend passed the confirmatory probe; the UI may render.
    Ready,
    /// Another startup sequence was already running; this request was dropped.
    AlreadyInProgress,
}

/// Releases the in-progress latch on every exit path.
struct LatchGuard<'a>(&'a AtomicBool);

impl Drop for LatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives the supervisor to readiness, at most one sequence at a time.
pub struct StartupCoordinator {
    supervisor: Arc<BackendSupervisor>,
    events: ShellEvents,
    in_progress: AtomicBool,
}

impl StartupCoordinator {
    pub fn new(supervisor: Arc<BackendSupervisor>, events: ShellEvents) -> Self {
        Self {
            supervisor,
            events,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Run the startup sequence.
    ///
    /// Sequence: reclaim the port (standalone only), start the supervisor,
    /// then one confirmatory probe. Any failure force-stops the supervisor,
    /// emits `backend-error` and is returned; the caller terminates.
    pub async fn start(&self) -> BackendResult<StartupOutcome> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Backend startup already in progress, ignoring duplicate request");
            return Ok(StartupOutcome::AlreadyInProgress);
        }
        let _latch = LatchGuard(&self.in_progress);

        match self.run_sequence().await {
            Ok(()) => {
                let status = self.supervisor.status().await;
                info!("Backend ready, notifying UI");
                self.events.emit(ShellEvent::BackendReady(status));
                Ok(StartupOutcome::Ready)
            }
            Err(e) => {
                error!("Backend startup failed: {e}");
                self.supervisor.fail(&e).await;
                self.supervisor.stop().await;
                self.events.emit(ShellEvent::BackendError {
                    message: e.to_string(),
                    recovery_hint: e.recovery_hint().to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_sequence(&self) -> BackendResult<()> {
        if let Some(port) = self.supervisor.standalone_port() {
            PortReclaimer::reclaim(port).await;
        }

        self.supervisor.start().await?;

        // Guards against the marker racing the listening socket
        match self.supervisor.probe_once().await {
            HealthVerdict::Healthy { .. } => Ok(()),
            HealthVerdict::TimedOut { last_error, .. } => {
                Err(BackendError::readiness_not_confirmed(
                    &self.supervisor.settings().health_url,
                    last_error,
                ))
            }
        }
    }
}

/// Wait for the supervised backend to exit after startup.
///
/// A non-zero exit the shell did not request is an error and should end
/// the application. Clean, requested, or absent processes resolve `Ok`.
pub async fn watch_backend(supervisor: &BackendSupervisor) -> BackendResult<()> {
    match supervisor.wait_for_exit().await {
        Some(exit) if exit.requested => {
            debug!("Backend terminated on request ({exit})");
            Ok(())
        }
        Some(exit) if exit.success() => {
            info!("Backend exited cleanly; no restart will be attempted");
            Ok(())
        }
        Some(exit) => {
            let e = BackendError::exited(exit);
            error!("{e}");
            Err(e)
        }
        None => {
            debug!("No supervised backend process to watch");
            Ok(())
        }
    }
}
