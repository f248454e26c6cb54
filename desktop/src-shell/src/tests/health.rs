use crate::backend::{HealthVerdict, ProbePolicy};

use std::time::Duration;

use td_config::StartupSettings;

#[test]
fn test_policy_from_default_settings() {
    let policy = ProbePolicy::from_settings(&StartupSettings::default());

    assert_eq!(policy.max_attempts, 10);
    assert_eq!(policy.interval, Duration::from_secs(1));
}

#[test]
fn test_single_policy() {
    let policy = ProbePolicy::single();

    assert_eq!(policy.max_attempts, 1);
    assert_eq!(policy.interval, Duration::ZERO);
}

#[test]
fn test_verdict_accessors() {
    let healthy = HealthVerdict::Healthy { attempts: 3 };
    let timed_out = HealthVerdict::TimedOut {
        attempts: 10,
        last_error: "HTTP 503".into(),
    };

    assert!(healthy.is_healthy());
    assert_eq!(healthy.attempts(), 3);
    assert!(!timed_out.is_healthy());
    assert_eq!(timed_out.attempts(), 10);
}
