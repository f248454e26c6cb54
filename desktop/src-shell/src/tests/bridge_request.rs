use crate::bridge::{BridgeRequest, RecordId};

use serde_json::{Value, json};

fn parse(value: Value) -> BridgeRequest {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_unit_commands_parse() {
    assert_eq!(parse(json!({"command": "quick-task"})), BridgeRequest::QuickTask);
    assert_eq!(parse(json!({"command": "list-reports"})), BridgeRequest::ListReports);
    assert_eq!(parse(json!({"command": "list-tasks"})), BridgeRequest::ListTasks);
    assert_eq!(parse(json!({"command": "get-app-paths"})), BridgeRequest::GetAppPaths);
    assert_eq!(
        parse(json!({"command": "get-database-path"})),
        BridgeRequest::GetDatabasePath
    );
    assert_eq!(
        parse(json!({"command": "get-backend-status"})),
        BridgeRequest::GetBackendStatus
    );
}

#[test]
fn test_start_long_task_carries_task_id() {
    assert_eq!(
        parse(json!({"command": "start-long-task", "task_id": "t-1"})),
        BridgeRequest::StartLongTask {
            task_id: "t-1".into()
        }
    );
}

#[test]
fn test_record_id_accepts_number_or_string() {
    assert_eq!(
        parse(json!({"command": "get-report", "id": 7})),
        BridgeRequest::GetReport {
            id: RecordId::Number(7)
        }
    );
    assert_eq!(
        parse(json!({"command": "delete-task", "id": "abc"})),
        BridgeRequest::DeleteTask {
            id: RecordId::Text("abc".into())
        }
    );
}

#[test]
fn test_record_id_display() {
    assert_eq!(RecordId::Number(42).to_string(), "42");
    assert_eq!(RecordId::Text("x-1".into()).to_string(), "x-1");
}

#[test]
fn test_update_carries_record() {
    let request = parse(json!({
        "command": "update-task",
        "id": 3,
        "task": {"title": "Ship it"}
    }));

    assert_eq!(
        request,
        BridgeRequest::UpdateTask {
            id: RecordId::Number(3),
            task: json!({"title": "Ship it"}),
        }
    );
}

#[test]
fn test_unknown_command_rejected() {
    let result: Result<BridgeRequest, _> =
        serde_json::from_value(json!({"command": "spawn-process", "path": "/bin/sh"}));

    assert!(result.is_err());
}

#[test]
fn test_missing_argument_rejected() {
    let result: Result<BridgeRequest, _> =
        serde_json::from_value(json!({"command": "create-report"}));

    assert!(result.is_err());
}
