mod backend;
mod bridge;
mod events;
mod logging;
mod shell;
mod status;

#[cfg(test)]
mod tests;

pub use backend::{
    BackendError, BackendProcessState, BackendResult, BackendSupervisor, HealthCheckAttempt,
    HealthProber, HealthVerdict, PortReclaimer, ProbeOutcome, ProbePolicy, ProcessExit,
    StartupCoordinator, StartupOutcome, SupervisorMode, SupervisorSettings, resolve_executable,
    watch_backend,
};
pub use bridge::{BridgeError, BridgeRequest, BridgeResult, RecordId, ShellBridge};
pub use events::{
    EVENT_BACKEND_ERROR, EVENT_BACKEND_READY, EVENT_BACKEND_STATE_CHANGED, ShellEvent,
    ShellEvents, forward_state_changes,
};
pub use logging::{current_log_path, setup_logging};
pub use shell::Shell;
pub use status::{BackendStatus, FailureRecord, build_backend_status};

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use td_config::{AppPaths, LaunchMode, ShellConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "taskdeck", version, about = "Taskdeck desktop shell")]
pub struct Cli {
    /// Attach to an already running backend instead of spawning one
    #[arg(long)]
    pub dev: bool,

    /// Application data directory (defaults to ~/.taskdeck)
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Directory holding the bundled backend executable
    #[arg(long, value_name = "PATH")]
    pub resources_dir: Option<PathBuf>,
}

/// Application entry point.
///
/// Runs everything on a single-threaded runtime. Exits non-zero when
/// startup fails or the backend dies unexpectedly.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run_shell(cli))
}

async fn run_shell(cli: Cli) -> ExitCode {
    let paths = match AppPaths::resolve(cli.data_dir.as_deref()).and_then(|paths| {
        paths.ensure()?;
        Ok(paths)
    }) {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("Failed to prepare application data directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut config = match ShellConfig::load_or_create(&paths.root) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if cli.dev {
        config.mode = LaunchMode::Attached;
    }
    if let Some(dir) = cli.resources_dir {
        config.backend.resources_dir = Some(dir);
    }

    if let Err(e) = setup_logging(&paths.logs, &config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    info!("Starting Taskdeck shell v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", paths.root.display());
    info!("Database: {}", paths.database.display());
    info!("Log file: {}", current_log_path(&paths.logs).display());
    config.log_summary();

    let shell = match Shell::new(&config, paths) {
        Ok(shell) => shell,
        Err(e) => {
            error!("Failed to initialize shell: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = shell.start().await {
        error!("Exiting after failed startup: {}", e.recovery_hint());
        shell.shutdown().await;
        return ExitCode::FAILURE;
    }

    match shell.run_until_shutdown().await {
        Ok(()) => {
            info!("Shell exited");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Terminating after backend failure: {e}");
            ExitCode::FAILURE
        }
    }
}
