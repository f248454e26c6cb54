//! Integration tests for the backend supervisor with generated shell-script backends

#![cfg(unix)]

mod common;

use common::*;

use app_lib::{
    BackendError, BackendProcessState, BackendSupervisor, ProbePolicy, SupervisorSettings,
    watch_backend,
};

use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serial_test::serial;
use td_config::{BackendSettings, LaunchMode, ShellConfig};
use tempfile::TempDir;

/// Captures formatted tracing output for assertions.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
#[serial]
async fn test_missing_executable_fails_with_executable_not_found() {
    let resources = TempDir::new().unwrap();
    let server = healthy_backend().await;
    let supervisor =
        BackendSupervisor::new(standalone_settings(resources.path(), &server.uri())).unwrap();

    let err = supervisor.start().await.unwrap_err();

    match &err {
        BackendError::ExecutableNotFound { path, .. } => {
            assert_eq!(path, &resources.path().join(EXECUTABLE));
        }
        other => panic!("expected ExecutableNotFound, got {other:?}"),
    }
    assert!(err.to_string().contains(&resources.path().display().to_string()));
    assert_eq!(supervisor.state(), BackendProcessState::Failed);
    assert_eq!(health_requests(&server).await, 0);
}

#[tokio::test]
#[serial]
async fn test_missing_executable_logs_resolved_path() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let resources = TempDir::new().unwrap();
    let server = healthy_backend().await;
    let supervisor =
        BackendSupervisor::new(standalone_settings(resources.path(), &server.uri())).unwrap();

    supervisor.start().await.unwrap_err();

    let output = logs.contents();
    let expected = resources.path().join(EXECUTABLE).display().to_string();
    assert!(output.contains("not found"), "{output}");
    assert!(output.contains(&expected), "{output}");
}

#[test]
fn test_settings_carry_gateway_timeout_from_config() {
    let config = ShellConfig {
        mode: LaunchMode::Attached,
        backend: BackendSettings {
            request_timeout_secs: 7,
            ..BackendSettings::default()
        },
        ..ShellConfig::default()
    };

    let settings = SupervisorSettings::from_config(&config).unwrap();

    assert_eq!(settings.gateway_timeout, Duration::from_secs(7));
    assert_eq!(settings.request_timeout, config.startup.health_request_timeout());
}

#[tokio::test]
#[serial]
async fn test_marker_and_probe_reach_healthy() {
    let resources = TempDir::new().unwrap();
    write_backend(resources.path(), &ready_script());
    let server = healthy_backend().await;
    let supervisor =
        BackendSupervisor::new(standalone_settings(resources.path(), &server.uri())).unwrap();

    supervisor.start().await.unwrap();

    assert_eq!(supervisor.state(), BackendProcessState::Healthy);
    assert!(supervisor.pid().await.is_some());
    let status = supervisor.status().await;
    assert!(status.is_healthy);
    assert!(status.stream_url.is_some());

    supervisor.stop().await;
    assert_eq!(supervisor.state(), BackendProcessState::Stopped);
}

#[tokio::test]
#[serial]
async fn test_marker_on_stderr_is_detected() {
    let resources = TempDir::new().unwrap();
    write_backend(resources.path(), &ready_on_stderr_script());
    let server = healthy_backend().await;
    let supervisor =
        BackendSupervisor::new(standalone_settings(resources.path(), &server.uri())).unwrap();

    supervisor.start().await.unwrap();

    assert_eq!(supervisor.state(), BackendProcessState::Healthy);
    supervisor.stop().await;
}

#[tokio::test]
#[serial]
async fn test_start_when_already_healthy_is_noop() {
    let resources = TempDir::new().unwrap();
    write_backend(resources.path(), &ready_script());
    let server = healthy_backend().await;
    let supervisor =
        BackendSupervisor::new(standalone_settings(resources.path(), &server.uri())).unwrap();

    supervisor.start().await.unwrap();
    let pid = supervisor.pid().await;
    supervisor.start().await.unwrap();

    assert_eq!(supervisor.pid().await, pid);
    supervisor.stop().await;
}

#[tokio::test]
#[serial]
async fn test_marker_without_health_fails_after_all_attempts() {
    let resources = TempDir::new().unwrap();
    write_backend(resources.path(), &ready_script());
    let server = unhealthy_backend().await;
    let mut settings = standalone_settings(resources.path(), &server.uri());
    settings.probe_policy = ProbePolicy::new(4, Duration::from_millis(100));
    let supervisor = BackendSupervisor::new(settings).unwrap();

    let started = Instant::now();
    let err = supervisor.start().await.unwrap_err();

    assert!(
        matches!(err, BackendError::HealthCheckTimedOut { attempts: 4, .. }),
        "{err:?}"
    );
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(health_requests(&server).await, 4);
    assert_eq!(supervisor.state(), BackendProcessState::Failed);

    supervisor.stop().await;
    assert_eq!(supervisor.state(), BackendProcessState::Stopped);
}

#[tokio::test]
#[serial]
async fn test_no_marker_times_out_without_probing() {
    let resources = TempDir::new().unwrap();
    write_backend(resources.path(), &silent_script());
    let server = healthy_backend().await;
    let mut settings = standalone_settings(resources.path(), &server.uri());
    settings.startup_timeout = Duration::from_millis(300);
    let supervisor = BackendSupervisor::new(settings).unwrap();

    let err = supervisor.start().await.unwrap_err();

    assert!(matches!(err, BackendError::StartupTimeout { .. }), "{err:?}");
    assert_eq!(health_requests(&server).await, 0);
    supervisor.stop().await;
}

#[tokio::test]
#[serial]
async fn test_early_nonzero_exit_fails_startup() {
    let resources = TempDir::new().unwrap();
    write_backend(resources.path(), "echo 'address already in use' >&2\nexit 3\n");
    let server = healthy_backend().await;
    let supervisor =
        BackendSupervisor::new(standalone_settings(resources.path(), &server.uri())).unwrap();

    let err = supervisor.start().await.unwrap_err();

    match err {
        BackendError::ProcessExitedNonZero { exit, .. } => assert_eq!(exit.code, Some(3)),
        other => panic!("expected ProcessExitedNonZero, got {other:?}"),
    }
    assert_eq!(supervisor.state(), BackendProcessState::Failed);
}

#[tokio::test]
#[serial]
async fn test_exit_code_one_after_healthy_is_reported() {
    let resources = TempDir::new().unwrap();
    write_backend(resources.path(), &exit_after_ready_script(2, 1));
    let server = healthy_backend().await;
    let supervisor =
        BackendSupervisor::new(standalone_settings(resources.path(), &server.uri())).unwrap();

    supervisor.start().await.unwrap();
    assert_eq!(supervisor.state(), BackendProcessState::Healthy);

    let err = watch_backend(&supervisor).await.unwrap_err();

    match err {
        BackendError::ProcessExitedNonZero { exit, .. } => {
            assert_eq!(exit.code, Some(1));
            assert!(!exit.requested);
        }
        other => panic!("expected ProcessExitedNonZero, got {other:?}"),
    }
    assert_eq!(supervisor.state(), BackendProcessState::Failed);
    assert!(supervisor.status().await.error.is_some());
}

#[tokio::test]
#[serial]
async fn test_clean_exit_after_healthy_is_a_stop() {
    let resources = TempDir::new().unwrap();
    write_backend(resources.path(), &exit_after_ready_script(1, 0));
    let server = healthy_backend().await;
    let supervisor =
        BackendSupervisor::new(standalone_settings(resources.path(), &server.uri())).unwrap();

    supervisor.start().await.unwrap();
    watch_backend(&supervisor).await.unwrap();

    assert_eq!(supervisor.state(), BackendProcessState::Stopped);
}

#[tokio::test]
#[serial]
async fn test_stop_terminates_child() {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let resources = TempDir::new().unwrap();
    write_backend(resources.path(), &ready_script());
    let server = healthy_backend().await;
    let supervisor =
        BackendSupervisor::new(standalone_settings(resources.path(), &server.uri())).unwrap();
    supervisor.start().await.unwrap();
    let pid = supervisor.pid().await.unwrap();

    supervisor.stop().await;

    assert!(kill(Pid::from_raw(pid as i32), None).is_err());
    assert_eq!(supervisor.pid().await, None);
    assert_eq!(supervisor.wait_for_exit().await, None);
}

#[tokio::test]
#[serial]
async fn test_stop_is_idempotent() {
    let server = healthy_backend().await;
    let supervisor = BackendSupervisor::new(attached_settings(&server.uri())).unwrap();

    supervisor.stop().await;
    supervisor.stop().await;

    assert_eq!(supervisor.state(), BackendProcessState::Stopped);
}

#[tokio::test]
#[serial]
async fn test_stop_after_running_then_again_is_noop() {
    let resources = TempDir::new().unwrap();
    write_backend(resources.path(), &ready_script());
    let server = healthy_backend().await;
    let supervisor =
        BackendSupervisor::new(standalone_settings(resources.path(), &server.uri())).unwrap();
    supervisor.start().await.unwrap();

    supervisor.stop().await;
    supervisor.stop().await;

    assert_eq!(supervisor.state(), BackendProcessState::Stopped);
}

#[tokio::test]
#[serial]
async fn test_stopped_supervisor_cannot_restart() {
    let server = healthy_backend().await;
    let supervisor = BackendSupervisor::new(attached_settings(&server.uri())).unwrap();
    supervisor.stop().await;

    let err = supervisor.start().await.unwrap_err();

    assert!(matches!(
        err,
        BackendError::NotRestartable {
            state: BackendProcessState::Stopped,
            ..
        }
    ));
}

#[tokio::test]
#[serial]
async fn test_attached_mode_probes_once_without_spawning() {
    let server = healthy_backend().await;
    let supervisor = BackendSupervisor::new(attached_settings(&server.uri())).unwrap();

    supervisor.start().await.unwrap();

    assert_eq!(supervisor.state(), BackendProcessState::Healthy);
    assert_eq!(supervisor.pid().await, None);
    assert_eq!(supervisor.standalone_port(), None);
    assert_eq!(health_requests(&server).await, 1);
}

#[tokio::test]
#[serial]
async fn test_attached_mode_unreachable_is_inaccessible() {
    let supervisor = BackendSupervisor::new(attached_settings(&unreachable_base_url())).unwrap();

    let err = supervisor.start().await.unwrap_err();

    assert!(matches!(err, BackendError::BackendInaccessible { .. }), "{err:?}");
    assert_eq!(supervisor.state(), BackendProcessState::Failed);
}
