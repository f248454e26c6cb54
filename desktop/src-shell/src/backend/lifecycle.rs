//! Backend process lifecycle.

use crate::backend::{
    BackendError, BackendProcessState, BackendResult, HealthProber, HealthVerdict, ProbePolicy,
    ProcessExit,
};
use crate::status::{BackendStatus, FailureRecord, build_backend_status};

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use td_config::{LaunchMode, ShellConfig};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

const UNBUFFERED_ENV: &str = "PYTHONUNBUFFERED";
const OUTPUT_TARGET: &str = "backend";
const STOP_WAIT: Duration = Duration::from_secs(5);

/// Whether the shell owns the backend process or only talks to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorMode {
    /// An externally managed backend is expected to be listening already.
    Attached,
    /// Spawn `executable` from the resource bundle and supervise it.
    Standalone {
        resources_dir: PathBuf,
        executable: String,
        port: u16,
    },
}

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub mode: SupervisorMode,
    pub base_url: String,
    pub health_url: String,
    pub stream_url: String,
    pub readiness_marker: String,
    pub startup_timeout: Duration,
    pub probe_policy: ProbePolicy,
    pub request_timeout: Duration,
    /// Upper bound for one call forwarded through the gateway
    pub gateway_timeout: Duration,
}

impl SupervisorSettings {
    pub fn from_config(config: &ShellConfig) -> BackendResult<Self> {
        let mode = match config.mode {
            LaunchMode::Attached => SupervisorMode::Attached,
            LaunchMode::Standalone => SupervisorMode::Standalone {
                resources_dir: config.backend.resolve_resources_dir()?,
                executable: config.backend.executable.clone(),
                port: config.backend.port,
            },
        };

        Ok(Self {
            mode,
            base_url: config.backend.base_url(),
            health_url: config.backend.health_url(),
            stream_url: config.backend.stream_url(),
            readiness_marker: config.startup.readiness_marker.clone(),
            startup_timeout: config.startup.startup_timeout(),
            probe_policy: ProbePolicy::from_settings(&config.startup),
            request_timeout: config.startup.health_request_timeout(),
            gateway_timeout: config.backend.request_timeout(),
        })
    }
}

/// Resolve the platform-specific path of the backend executable.
pub fn resolve_executable(resources_dir: &Path, executable: &str) -> PathBuf {
    let suffix = std::env::consts::EXE_SUFFIX;

    if suffix.is_empty() || executable.ends_with(suffix) {
        resources_dir.join(executable)
    } else {
        resources_dir.join(format!("{executable}{suffix}"))
    }
}

/// The supervisor's hold on a spawned child. The child itself lives in
/// the monitor task; this is the only way to signal it.
struct ChildHandle {
    pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    exit_rx: watch::Receiver<Option<ProcessExit>>,
}

/// Owns the backend process and its `BackendProcessState`.
///
/// One instance per application run. The child handle is created by
/// `start()` and cleared by `stop()`.
pub struct BackendSupervisor {
    settings: SupervisorSettings,
    prober: HealthProber,
    state_tx: Arc<watch::Sender<BackendProcessState>>,
    child: Mutex<Option<ChildHandle>>,
    failure: Arc<Mutex<Option<FailureRecord>>>,
}

impl BackendSupervisor {
    pub fn new(settings: SupervisorSettings) -> BackendResult<Self> {
        let prober = HealthProber::new(settings.request_timeout)?;
        let (state_tx, _) = watch::channel(BackendProcessState::NotStarted);

        Ok(Self {
            settings,
            prober,
            state_tx: Arc::new(state_tx),
            child: Mutex::new(None),
            failure: Arc::new(Mutex::new(None)),
        })
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    pub fn state(&self) -> BackendProcessState {
        *self.state_tx.borrow()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<BackendProcessState> {
        self.state_tx.subscribe()
    }

    /// Port to reclaim before spawning, standalone mode only.
    pub fn standalone_port(&self) -> Option<u16> {
        match &self.settings.mode {
            SupervisorMode::Standalone { port, .. } => Some(*port),
            SupervisorMode::Attached => None,
        }
    }

    pub async fn pid(&self) -> Option<u32> {
        self.child.lock().await.as_ref().and_then(|child| child.pid)
    }

    pub async fn last_failure(&self) -> Option<FailureRecord> {
        self.failure.lock().await.clone()
    }

    pub async fn status(&self) -> BackendStatus {
        let failure = self.last_failure().await;

        build_backend_status(
            self.state(),
            &self.settings.base_url,
            &self.settings.stream_url,
            self.pid().await,
            failure.as_ref(),
        )
    }

    /// One health request against the backend, no retry.
    pub async fn probe_once(&self) -> HealthVerdict {
        self.prober
            .probe(&self.settings.health_url, ProbePolicy::single())
            .await
    }

    /// Bring the backend to `Healthy`.
    ///
    /// Attached mode runs a single probe. Standalone mode spawns the
    /// executable, waits for the readiness marker (bounded by the startup
    /// timeout) and then runs the full probe sequence.
    pub async fn start(&self) -> BackendResult<()> {
        match self.state() {
            BackendProcessState::Healthy => {
                debug!("Backend already healthy");
                return Ok(());
            }
            BackendProcessState::NotStarted => {}
            state => return Err(BackendError::not_restartable(state)),
        }

        transition(&self.state_tx, BackendProcessState::Starting);

        let result = match &self.settings.mode {
            SupervisorMode::Attached => self.attach().await,
            SupervisorMode::Standalone {
                resources_dir,
                executable,
                ..
            } => self.launch(resources_dir, executable).await,
        };

        match result {
            Ok(()) if transition(&self.state_tx, BackendProcessState::Healthy) => {
                info!("Backend is healthy at {}", self.settings.base_url);
                Ok(())
            }
            Ok(()) => Err(BackendError::stopped_before_ready()),
            Err(e) => {
                self.fail(&e).await;
                Err(e)
            }
        }
    }

    /// Record `error` and move to `Failed` unless already stopped.
    pub async fn fail(&self, error: &BackendError) {
        *self.failure.lock().await = Some(FailureRecord::from(error));
        transition(&self.state_tx, BackendProcessState::Failed);
    }

    /// Terminate the child if there is one and move to `Stopped`.
    ///
    /// Idempotent: safe to call before `start()`, twice, or after the
    /// process already exited on its own.
    pub async fn stop(&self) {
        let handle = self.child.lock().await.take();

        if let Some(mut handle) = handle {
            if let Some(kill_tx) = handle.kill_tx.take() {
                info!("Stopping backend (pid {:?})", handle.pid);
                let _ = kill_tx.send(());
            }

            match tokio::time::timeout(STOP_WAIT, wait_exit(&mut handle.exit_rx)).await {
                Ok(Some(exit)) => debug!("Backend exited: {exit}"),
                Ok(None) => debug!("Backend monitor ended without an exit status"),
                Err(_) => warn!("Backend did not exit within {}s", STOP_WAIT.as_secs()),
            }
        }

        if transition(&self.state_tx, BackendProcessState::Stopped) {
            info!("Backend stopped");
        }
    }

    /// Resolve when the supervised child exits.
    ///
    /// Returns `None` immediately when there is no child (attached mode,
    /// never started, or already stopped).
    pub async fn wait_for_exit(&self) -> Option<ProcessExit> {
        let mut exit_rx = self.child.lock().await.as_ref()?.exit_rx.clone();
        wait_exit(&mut exit_rx).await
    }

    async fn attach(&self) -> BackendResult<()> {
        let endpoint = &self.settings.health_url;
        info!("Attached mode: expecting a running backend at {endpoint}");

        match self.prober.probe(endpoint, ProbePolicy::single()).await {
            HealthVerdict::Healthy { .. } => Ok(()),
            HealthVerdict::TimedOut { last_error, .. } => {
                Err(BackendError::inaccessible(endpoint, last_error))
            }
        }
    }

    async fn launch(&self, resources_dir: &Path, executable: &str) -> BackendResult<()> {
        let path = resolve_executable(resources_dir, executable);
        info!("Backend executable: {}", path.display());

        if !path.exists() {
            error!("Backend executable not found at {}", path.display());
            return Err(BackendError::executable_not_found(path));
        }

        #[cfg(unix)]
        ensure_executable(&path);

        let mut child = Command::new(&path)
            .current_dir(resources_dir)
            .env(UNBUFFERED_ENV, "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BackendError::spawn(&path, e))?;

        let pid = child.id();
        info!("Spawned backend with pid {pid:?}");

        let (marker_tx, mut marker_rx) = mpsc::channel(1);
        let marker = self.settings.readiness_marker.clone();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(watch_output(stdout, "stdout", marker.clone(), marker_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(watch_output(stderr, "stderr", marker, marker_tx));
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(monitor_child(
            child,
            kill_rx,
            exit_tx,
            Arc::clone(&self.state_tx),
            Arc::clone(&self.failure),
        ));

        *self.child.lock().await = Some(ChildHandle {
            pid,
            kill_tx: Some(kill_tx),
            exit_rx: exit_rx.clone(),
        });

        self.await_readiness(&mut marker_rx, exit_rx).await
    }

    /// Marker first (bounded by the startup timeout), then the probe
    /// sequence. Either wait is cut short if the child exits.
    async fn await_readiness(
        &self,
        marker_rx: &mut mpsc::Receiver<()>,
        mut exit_rx: watch::Receiver<Option<ProcessExit>>,
    ) -> BackendResult<()> {
        let timeout = self.settings.startup_timeout;

        let marker = tokio::time::timeout(timeout, async {
            tokio::select! {
                Some(()) = marker_rx.recv() => Ok(()),
                exit = wait_exit(&mut exit_rx) => Err(early_exit_error(exit)),
            }
        })
        .await;

        match marker {
            Ok(Ok(())) => info!("Readiness marker seen, confirming with health probe"),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                error!(
                    "No readiness marker from backend within {}s",
                    timeout.as_secs()
                );
                return Err(BackendError::startup_timeout(timeout.as_secs()));
            }
        }

        let endpoint = &self.settings.health_url;
        tokio::select! {
            verdict = self.prober.probe(endpoint, self.settings.probe_policy) => match verdict {
                HealthVerdict::Healthy { .. } => Ok(()),
                HealthVerdict::TimedOut { attempts, last_error } => {
                    Err(BackendError::health_check_timed_out(endpoint, attempts, last_error))
                }
            },
            exit = wait_exit(&mut exit_rx) => Err(early_exit_error(exit)),
        }
    }
}

/// Apply a state change if the state machine allows it.
fn transition(state_tx: &watch::Sender<BackendProcessState>, next: BackendProcessState) -> bool {
    let mut from = None;

    let changed = state_tx.send_if_modified(|current| {
        if current.can_transition_to(next) {
            from = Some(*current);
            *current = next;
            true
        } else {
            false
        }
    });

    match from {
        Some(from) => info!("Backend state: {from} -> {next}"),
        None => debug!("Ignoring backend state change to {next}"),
    }

    changed
}

async fn wait_exit(exit_rx: &mut watch::Receiver<Option<ProcessExit>>) -> Option<ProcessExit> {
    match exit_rx.wait_for(Option::is_some).await {
        Ok(exit) => *exit,
        Err(_) => None,
    }
}

fn early_exit_error(exit: Option<ProcessExit>) -> BackendError {
    match exit {
        Some(exit) if !exit.requested && !exit.success() => BackendError::exited(exit),
        _ => BackendError::stopped_before_ready(),
    }
}

/// Own the child until it exits, then publish the exit and update state.
///
/// A zero exit is a clean stop; anything else not requested by the shell
/// is a failure.
async fn monitor_child(
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    exit_tx: watch::Sender<Option<ProcessExit>>,
    state_tx: Arc<watch::Sender<BackendProcessState>>,
    failure: Arc<Mutex<Option<FailureRecord>>>,
) {
    let (status, requested) = tokio::select! {
        status = child.wait() => (status, false),
        _ = kill_rx => {
            if let Err(e) = child.start_kill() {
                warn!("Failed to signal backend: {e}");
            }
            (child.wait().await, true)
        }
    };

    let exit = ProcessExit {
        code: match status {
            Ok(status) => status.code(),
            Err(e) => {
                error!("Failed to wait for backend process: {e}");
                None
            }
        },
        requested,
    };

    if requested {
        info!("Backend terminated ({exit})");
    } else if exit.success() {
        info!("Backend exited cleanly");
        transition(&state_tx, BackendProcessState::Stopped);
    } else {
        let e = BackendError::exited(exit);
        error!("{e}");
        *failure.lock().await = Some(FailureRecord::from(&e));
        transition(&state_tx, BackendProcessState::Failed);
    }

    exit_tx.send_replace(Some(exit));
}

/// Relay child output into the log and signal the first readiness marker.
async fn watch_output<R>(reader: R, stream: &'static str, marker: String, marker_tx: mpsc::Sender<()>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut seen = false;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                info!(target: OUTPUT_TARGET, stream, "{line}");

                // Heuristic only; the probe that follows is authoritative
                if !seen && line.contains(&marker) {
                    seen = true;
                    let _ = marker_tx.try_send(());
                }
            }
            Err(e) => {
                warn!(target: OUTPUT_TARGET, stream, "Failed to read backend output: {e}");
                break;
            }
        }
    }
}

#[cfg(unix)]
fn ensure_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)) {
        warn!(
            "Could not set executable permission on {}: {e}",
            path.display()
        );
    }
}
