use crate::{BackendSettings, LoggingSettings, ShellConfig, StartupSettings};

use googletest::assert_that;
use googletest::prelude::{anything, contains_substring, err, ok};

#[test]
fn given_default_config_when_validate_then_ok() {
    assert_that!(ShellConfig::default().validate(), ok(anything()));
}

#[test]
fn given_localhost_host_when_validate_then_ok() {
    let settings = BackendSettings {
        host: String::from("localhost"),
        ..Default::default()
    };

    assert_that!(settings.validate(), ok(anything()));
}

#[test]
fn given_non_loopback_host_when_validate_then_error() {
    let settings = BackendSettings {
        host: String::from("0.0.0.0"),
        ..Default::default()
    };

    let result = settings.validate();

    assert_that!(result, err(anything()));
    assert_that!(
        result.unwrap_err().to_string(),
        contains_substring("backend.host")
    );
}

#[test]
fn given_zero_request_timeout_when_validate_then_error() {
    let settings = BackendSettings {
        request_timeout_secs: 0,
        ..Default::default()
    };

    assert_that!(
        settings.validate().unwrap_err().to_string(),
        contains_substring("backend.request_timeout_secs")
    );
}

#[test]
fn given_health_path_without_slash_when_validate_then_error() {
    let settings = BackendSettings {
        health_path: String::from("api/quick-task"),
        ..Default::default()
    };

    assert_that!(
        settings.validate().unwrap_err().to_string(),
        contains_substring("backend.health_path")
    );
}

#[test]
fn given_empty_executable_when_validate_then_error() {
    let settings = BackendSettings {
        executable: String::from("  "),
        ..Default::default()
    };

    assert_that!(settings.validate(), err(anything()));
}

#[test]
fn given_zero_startup_timeout_when_validate_then_error() {
    let settings = StartupSettings {
        startup_timeout_secs: 0,
        ..Default::default()
    };

    assert_that!(
        settings.validate().unwrap_err().to_string(),
        contains_substring("startup_timeout_secs")
    );
}

#[test]
fn given_zero_probe_attempts_when_validate_then_error() {
    let settings = StartupSettings {
        health_max_attempts: 0,
        ..Default::default()
    };

    assert_that!(
        settings.validate().unwrap_err().to_string(),
        contains_substring("health_max_attempts")
    );
}

#[test]
fn given_blank_readiness_marker_when_validate_then_error() {
    let settings = StartupSettings {
        readiness_marker: String::new(),
        ..Default::default()
    };

    assert_that!(settings.validate(), err(anything()));
}

#[test]
fn given_unknown_log_level_when_validate_then_error() {
    let settings = LoggingSettings {
        level: String::from("verbose"),
        ..Default::default()
    };

    assert_that!(
        settings.validate().unwrap_err().to_string(),
        contains_substring("logging.level")
    );
}

#[test]
fn given_uppercase_log_level_when_validate_then_ok() {
    let settings = LoggingSettings {
        level: String::from("DEBUG"),
        ..Default::default()
    };

    assert_that!(settings.validate(), ok(anything()));
}
