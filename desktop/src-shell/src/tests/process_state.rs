use crate::backend::BackendProcessState::{self, *};

const ALL: [BackendProcessState; 5] = [NotStarted, Starting, Healthy, Failed, Stopped];

#[test]
fn test_forward_transitions_allowed() {
    assert!(NotStarted.can_transition_to(Starting));
    assert!(Starting.can_transition_to(Healthy));
    assert!(Starting.can_transition_to(Failed));
    assert!(Healthy.can_transition_to(Failed));
}

#[test]
fn test_backward_transitions_rejected() {
    assert!(!Starting.can_transition_to(NotStarted));
    assert!(!Healthy.can_transition_to(Starting));
    assert!(!Failed.can_transition_to(Healthy));
    assert!(!Failed.can_transition_to(Starting));
    assert!(!NotStarted.can_transition_to(Healthy));
}

#[test]
fn test_stopped_reachable_from_every_other_state() {
    for state in ALL.into_iter().filter(|s| *s != Stopped) {
        assert!(state.can_transition_to(Stopped), "{state} -> stopped");
    }
}

#[test]
fn test_stopped_is_terminal() {
    for next in ALL {
        assert!(!Stopped.can_transition_to(next), "stopped -> {next}");
    }
    assert!(Stopped.is_terminal());
    assert!(!Failed.is_terminal());
}

#[test]
fn test_state_serializes_snake_case() {
    assert_eq!(serde_json::to_value(NotStarted).unwrap(), "not_started");
    assert_eq!(Healthy.to_string(), "healthy");
}
