//! The assembled shell: supervisor, coordinator, bridge and events.

use crate::backend::{
    BackendResult, BackendSupervisor, StartupCoordinator, StartupOutcome, SupervisorSettings,
    watch_backend,
};
use crate::bridge::ShellBridge;
use crate::events::{ShellEvents, forward_state_changes};

use std::sync::Arc;

use td_config::{AppPaths, ShellConfig};
use td_gateway::Gateway;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub struct Shell {
    supervisor: Arc<BackendSupervisor>,
    coordinator: StartupCoordinator,
    bridge: ShellBridge,
    events: ShellEvents,
    state_events: JoinHandle<()>,
}

impl Shell {
    /// Wire up the shell for `config`. Nothing is spawned until [`Shell::start`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &ShellConfig, paths: AppPaths) -> BackendResult<Self> {
        let settings = SupervisorSettings::from_config(config)?;
        Self::with_settings(settings, paths)
    }

    pub fn with_settings(settings: SupervisorSettings, paths: AppPaths) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.gateway_timeout)
            .build()?;
        let gateway = Gateway::with_client(&settings.base_url, client);
        let stream_url = settings.stream_url.clone();

        let supervisor = Arc::new(BackendSupervisor::new(settings)?);
        let events = ShellEvents::default();
        let state_events = forward_state_changes(Arc::clone(&supervisor), events.clone());
        let coordinator = StartupCoordinator::new(Arc::clone(&supervisor), events.clone());
        let bridge = ShellBridge::new(gateway, stream_url, paths, Arc::clone(&supervisor));

        Ok(Self {
            supervisor,
            coordinator,
            bridge,
            events,
            state_events,
        })
    }

    pub fn supervisor(&self) -> &Arc<BackendSupervisor> {
        &self.supervisor
    }

    pub fn bridge(&self) -> &ShellBridge {
        &self.bridge
    }

    pub fn events(&self) -> &ShellEvents {
        &self.events
    }

    pub async fn start(&self) -> BackendResult<StartupOutcome> {
        self.coordinator.start().await
    }

    /// Run until a shutdown signal or an unexpected backend exit.
    ///
    /// A clean backend exit keeps the shell up until shutdown. The backend
    /// is always stopped before this returns.
    pub async fn run_until_shutdown(&self) -> BackendResult<()> {
        let result = tokio::select! {
            exit = watch_backend(&self.supervisor) => match exit {
                Ok(()) => {
                    shutdown_signal().await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            _ = shutdown_signal() => Ok(()),
        };

        self.shutdown().await;
        result
    }

    pub async fn shutdown(&self) {
        info!("Shutting down shell");
        self.supervisor.stop().await;
        self.state_events.abort();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to register SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
