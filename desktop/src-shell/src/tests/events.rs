use crate::backend::BackendProcessState;
use crate::events::{EVENT_BACKEND_ERROR, EVENT_BACKEND_READY, ShellEvent, ShellEvents};
use crate::status::build_backend_status;

use serde_json::json;

#[test]
fn test_error_event_wire_format() {
    let event = ShellEvent::BackendError {
        message: "boom".into(),
        recovery_hint: "restart".into(),
    };

    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(event.name(), EVENT_BACKEND_ERROR);
    assert_eq!(
        value,
        json!({
            "event": "backend-error",
            "payload": {"message": "boom", "recovery_hint": "restart"}
        })
    );
}

#[test]
fn test_ready_event_carries_status() {
    let status = build_backend_status(
        BackendProcessState::Healthy,
        "http://127.0.0.1:8000",
        "ws://127.0.0.1:8000/ws",
        Some(7),
        None,
    );
    let event = ShellEvent::BackendReady(status);

    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(event.name(), EVENT_BACKEND_READY);
    assert_eq!(value["event"], "backend-ready");
    assert_eq!(value["payload"]["pid"], 7);
}

#[tokio::test]
async fn test_emit_reaches_subscribers() {
    let events = ShellEvents::default();
    let mut rx = events.subscribe();

    events.emit(ShellEvent::BackendError {
        message: "m".into(),
        recovery_hint: "h".into(),
    });

    let received = rx.recv().await.unwrap();
    assert_eq!(received.name(), EVENT_BACKEND_ERROR);
}

#[test]
fn test_emit_without_subscribers_is_silent() {
    let events = ShellEvents::new(4);

    events.emit(ShellEvent::BackendError {
        message: "m".into(),
        recovery_hint: "h".into(),
    });
}
