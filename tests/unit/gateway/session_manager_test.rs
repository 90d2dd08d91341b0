//! Unit tests for gateway session negotiation and the direct fallback

use crate::unit::common::{shared, test_config};
use flinkpilot::flinkpilot::cluster::{MockCall, MockFailure, SessionHandle};
use flinkpilot::{MockClusterApi, PilotError, Session, SessionManager};

#[tokio::test]
async fn test_gateway_session_created() {
    let (mock, api) = shared(MockClusterApi::new().with_session("sess-42"));
    let manager = SessionManager::new(api);

    let session = manager
        .create_session(&test_config().session)
        .await
        .unwrap();
    assert_eq!(session, Session::Gateway(SessionHandle("sess-42".to_string())));
    assert!(session.is_gateway());
    assert_eq!(mock.count_calls(|c| *c == MockCall::Jars), 0);
}

#[tokio::test]
async fn test_session_request_carries_properties() {
    let (mock, api) = shared(MockClusterApi::new().with_session("s"));
    let manager = SessionManager::new(api);
    manager
        .create_session(&test_config().session)
        .await
        .unwrap();

    let request = mock
        .calls()
        .into_iter()
        .find_map(|c| match c {
            MockCall::CreateSession(request) => Some(request),
            _ => None,
        })
        .unwrap();
    assert_eq!(request.session_name, "iot-pipeline-session");
    assert_eq!(request.planner, "blink");
    assert_eq!(request.execution_type, "streaming");
    assert_eq!(
        request.properties.get("execution.runtime-mode").map(String::as_str),
        Some("STREAMING")
    );
    assert_eq!(
        request.properties.get("parallelism.default").map(String::as_str),
        Some("2")
    );
    assert_eq!(
        request
            .properties
            .get("execution.checkpointing.interval")
            .map(String::as_str),
        Some("60s")
    );
}

#[tokio::test]
async fn test_unreachable_gateway_falls_back_to_direct() {
    let (mock, api) = shared(
        MockClusterApi::new()
            .with_session_failure(MockFailure::Transport)
            .with_jars(),
    );
    let manager = SessionManager::new(api);

    let session = manager
        .create_session(&test_config().session)
        .await
        .unwrap();
    assert_eq!(session, Session::Direct);
    assert!(session.handle().is_none());
    assert_eq!(mock.count_calls(|c| *c == MockCall::Jars), 1);
}

#[tokio::test]
async fn test_gateway_error_status_also_falls_back() {
    let (_mock, api) = shared(
        MockClusterApi::new()
            .with_session_failure(MockFailure::Status(404))
            .with_jars(),
    );
    let manager = SessionManager::new(api);
    let session = manager
        .create_session(&test_config().session)
        .await
        .unwrap();
    assert_eq!(session, Session::Direct);
}

#[tokio::test]
async fn test_no_submission_method_available() {
    let (_mock, api) = shared(
        MockClusterApi::new()
            .with_session_failure(MockFailure::Status(404))
            .with_jars_failure(MockFailure::Status(404)),
    );
    let manager = SessionManager::new(api);

    let err = manager
        .create_session(&test_config().session)
        .await
        .unwrap_err();
    assert!(matches!(err, PilotError::NoSubmissionMethod { .. }));
}

#[test]
fn test_session_display() {
    let gateway = Session::Gateway(SessionHandle("abc".to_string()));
    assert_eq!(gateway.to_string(), "gateway session abc");
    assert_eq!(Session::Direct.to_string(), "direct submission");
}
