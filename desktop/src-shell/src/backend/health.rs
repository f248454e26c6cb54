//! Bounded, strictly sequential health probing.

use crate::backend::BackendResult;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use td_config::StartupSettings;
use tracing::{debug, info, warn};

/// Attempt ceiling and spacing for one probe sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl ProbePolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// One attempt, no retry. Used for attached mode and the confirmatory check.
    pub fn single() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn from_settings(settings: &StartupSettings) -> Self {
        Self::new(settings.health_max_attempts, settings.health_interval())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    Success,
    Failure,
}

/// Record of one request within a probe sequence. Discarded with the sequence.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckAttempt {
    /// 1-based
    pub index: u32,
    pub outcome: ProbeOutcome,
    pub at: DateTime<Utc>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthVerdict {
    Healthy { attempts: u32 },
    TimedOut { attempts: u32, last_error: String },
}

impl HealthVerdict {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthVerdict::Healthy { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            HealthVerdict::Healthy { attempts } | HealthVerdict::TimedOut { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Answers "is this endpoint serving yet?". Holds no shared state; the
/// verdict goes back to the caller.
#[derive(Debug, Clone)]
pub struct HealthProber {
    client: reqwest::Client,
}

impl HealthProber {
    /// Create a prober whose individual requests give up after `request_timeout`.
    pub fn new(request_timeout: Duration) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(1)
            .build()?;

        Ok(Self { client })
    }

    /// Perform a single request against `endpoint`.
    ///
    /// Any 2xx status is a success; connection failures, timeouts and
    /// other statuses are failures.
    pub async fn check(&self, endpoint: &str, index: u32) -> HealthCheckAttempt {
        let (outcome, detail) = match self.client.get(endpoint).send().await {
            Ok(resp) if resp.status().is_success() => (ProbeOutcome::Success, None),
            Ok(resp) => (ProbeOutcome::Failure, Some(format!("HTTP {}", resp.status()))),
            Err(e) => (ProbeOutcome::Failure, Some(e.to_string())),
        };

        HealthCheckAttempt {
            index,
            outcome,
            at: Utc::now(),
            detail,
        }
    }

    /// Probe until the first success or until `policy.max_attempts` is reached.
    ///
    /// Attempts never overlap: each waits for the previous request to
    /// finish, then sleeps `policy.interval` before the next.
    pub async fn probe(&self, endpoint: &str, policy: ProbePolicy) -> HealthVerdict {
        let mut last_error = String::from("no attempts made");

        for index in 1..=policy.max_attempts {
            let attempt = self.check(endpoint, index).await;

            match attempt.outcome {
                ProbeOutcome::Success => {
                    info!(
                        "Health check passed on attempt {}/{} at {}",
                        attempt.index, policy.max_attempts, attempt.at
                    );
                    return HealthVerdict::Healthy { attempts: index };
                }
                ProbeOutcome::Failure => {
                    last_error = attempt.detail.unwrap_or_default();
                    debug!(
                        "Health check attempt {}/{} failed at {}: {}",
                        attempt.index, policy.max_attempts, attempt.at, last_error
                    );
                }
            }

            if index < policy.max_attempts {
                tokio::time::sleep(policy.interval).await;
            }
        }

        warn!(
            "Health check of {endpoint} gave up after {} attempts: {last_error}",
            policy.max_attempts
        );

        HealthVerdict::TimedOut {
            attempts: policy.max_attempts,
            last_error,
        }
    }
}
