//! Reclaiming the backend port from stale processes.

use tokio::process::Command;
use tracing::{debug, info, warn};

const HOST: &str = "127.0.0.1";

pub struct PortReclaimer;

impl PortReclaimer {
    /// Forcefully terminate whatever process is bound to `port`.
    ///
    /// Best-effort: lookup and kill failures are logged, never returned.
    pub async fn reclaim(port: u16) {
        if Self::is_available(port) {
            debug!("Port {port} is free");
            return;
        }

        let owners = match Self::find_owners(port).await {
            Ok(owners) => owners,
            Err(e) => {
                warn!("Could not look up the owner of port {port}: {e}");
                return;
            }
        };

        let own_pid = std::process::id();
        let stale: Vec<u32> = owners
            .into_iter()
            .filter(|pid| *pid != 0 && *pid != own_pid)
            .collect();

        if stale.is_empty() {
            debug!("Port {port} is busy but no owning process was found");
            return;
        }

        for pid in stale {
            warn!("Port {port} is held by stale process {pid}, terminating it");
            Self::kill(pid).await;
        }
    }

    /// Check if a port is available for binding on the loopback interface.
    pub fn is_available(port: u16) -> bool {
        std::net::TcpListener::bind((HOST, port)).is_ok()
    }

    /// Pids listening on `port`. Clients connected to it are not owners.
    #[cfg(unix)]
    async fn find_owners(port: u16) -> std::io::Result<Vec<u32>> {
        let output = Command::new("lsof")
            .args(["-t", "-n", "-P", &format!("-iTCP:{port}"), "-sTCP:LISTEN"])
            .output()
            .await?;

        Ok(parse_lsof(&String::from_utf8_lossy(&output.stdout)))
    }

    #[cfg(windows)]
    async fn find_owners(port: u16) -> std::io::Result<Vec<u32>> {
        let output = Command::new("netstat").args(["-ano"]).output().await?;

        Ok(parse_netstat(&String::from_utf8_lossy(&output.stdout), port))
    }

    #[cfg(not(any(unix, windows)))]
    async fn find_owners(_port: u16) -> std::io::Result<Vec<u32>> {
        Ok(Vec::new())
    }

    #[cfg(unix)]
    async fn kill(pid: u32) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            warn!("Ignoring out-of-range pid {pid}");
            return;
        };

        match kill(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) => info!("Sent SIGKILL to pid {pid}"),
            Err(e) => warn!("Failed to kill pid {pid}: {e}"),
        }
    }

    #[cfg(windows)]
    async fn kill(pid: u32) {
        match Command::new("taskkill")
            .args(["/F", "/PID", &pid.to_string()])
            .output()
            .await
        {
            Ok(output) if output.status.success() => info!("Terminated pid {pid}"),
            Ok(output) => warn!("taskkill for pid {pid} exited with {}", output.status),
            Err(e) => warn!("Failed to run taskkill for pid {pid}: {e}"),
        }
    }

    #[cfg(not(any(unix, windows)))]
    async fn kill(pid: u32) {
        warn!("Cannot terminate pid {pid} on this platform");
    }
}

/// Parse `lsof -t` output: one pid per line.
#[cfg_attr(not(unix), allow(dead_code))]
pub(crate) fn parse_lsof(output: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

/// Parse `netstat -ano` output for TCP listeners on `port`.
///
/// Rows look like `TCP  127.0.0.1:8000  0.0.0.0:0  LISTENING  4242`.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn parse_netstat(output: &str, port: u16) -> Vec<u32> {
    let suffix = format!(":{port}");

    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            match columns.as_slice() {
                [proto, local, _remote, state, pid]
                    if proto.eq_ignore_ascii_case("tcp")
                        && local.ends_with(&suffix)
                        && state.eq_ignore_ascii_case("listening") =>
                {
                    pid.parse().ok()
                }
                _ => None,
            }
        })
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}
