//! Fake backends for supervisor and coordinator tests.

#![allow(dead_code)]

use app_lib::{ProbePolicy, SupervisorMode, SupervisorSettings};

use std::path::{Path, PathBuf};
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const HEALTH_PATH: &str = "/api/quick-task";
pub const EXECUTABLE: &str = "api";

const MARKER_LINE: &str = "INFO:     Application startup complete.";

/// Prints the marker and keeps running.
pub fn ready_script() -> String {
    format!("echo \"{MARKER_LINE}\"\nexec sleep 30\n")
}

/// Prints the marker on stderr and keeps running.
pub fn ready_on_stderr_script() -> String {
    format!("echo \"{MARKER_LINE}\" >&2\nexec sleep 30\n")
}

/// Records each launch in `counter`, then behaves like [`ready_script`].
pub fn counting_script(counter: &Path) -> String {
    format!(
        "echo spawned >> '{}'\n{}",
        counter.display(),
        ready_script()
    )
}

/// Prints the marker, then exits with `code` after `delay_secs`.
pub fn exit_after_ready_script(delay_secs: u32, code: i32) -> String {
    format!("echo \"{MARKER_LINE}\"\nsleep {delay_secs}\nexit {code}\n")
}

/// Never prints the marker.
pub fn silent_script() -> String {
    String::from("echo \"INFO:     Waiting for application startup.\"\nexec sleep 30\n")
}

/// Write `body` as the backend executable in `dir`.
///
/// Written without the executable bit; the supervisor must set it.
pub fn write_backend(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join(EXECUTABLE);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    path
}

pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn settings(mode: SupervisorMode, base_url: &str) -> SupervisorSettings {
    SupervisorSettings {
        mode,
        base_url: base_url.to_string(),
        health_url: format!("{base_url}{HEALTH_PATH}"),
        stream_url: format!("{}/ws", base_url.replacen("http", "ws", 1)),
        readiness_marker: String::from("Application startup complete"),
        startup_timeout: Duration::from_secs(5),
        probe_policy: ProbePolicy::new(3, Duration::from_millis(50)),
        request_timeout: Duration::from_millis(500),
        gateway_timeout: Duration::from_secs(5),
    }
}

pub fn standalone_settings(resources_dir: &Path, base_url: &str) -> SupervisorSettings {
    settings(
        SupervisorMode::Standalone {
            resources_dir: resources_dir.to_path_buf(),
            executable: String::from(EXECUTABLE),
            port: free_port(),
        },
        base_url,
    )
}

pub fn attached_settings(base_url: &str) -> SupervisorSettings {
    settings(SupervisorMode::Attached, base_url)
}

/// Base URL nobody is listening on.
pub fn unreachable_base_url() -> String {
    format!("http://127.0.0.1:{}", free_port())
}

/// Health endpoint that always answers 200.
pub async fn healthy_backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(HEALTH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Quick task completed"
        })))
        .mount(&server)
        .await;
    server
}

/// Health endpoint that always answers 503.
pub async fn unhealthy_backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(HEALTH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    server
}

pub async fn health_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|req| req.url.path() == HEALTH_PATH)
        .count()
}
