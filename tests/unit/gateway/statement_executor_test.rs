//! Unit tests for statement execution and operation polling
//!
//! Tests cover:
//! - Status sequences and poll spacing
//! - Operation timeout
//! - Tolerant vs strict failure policies
//! - Direct-mode heuristic

use crate::unit::common::{clock, shared, test_config};
use flinkpilot::flinkpilot::cluster::{MockCall, MockFailure, OperationHandle, SessionHandle};
use flinkpilot::{
    FailurePolicy, MockClusterApi, OperationStatus, Session, StatementExecutor, StatementParser,
};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const THREE_DDL: &str = "CREATE TABLE a (id INT);\nCREATE TABLE b (id INT);\nCREATE TABLE c (id INT);\n";

fn gateway() -> Session {
    Session::Gateway(SessionHandle("sess-1".to_string()))
}

fn status_polls(mock: &MockClusterApi) -> usize {
    mock.count_calls(|c| matches!(c, MockCall::OperationStatus(_)))
}

#[tokio::test]
async fn test_pending_running_finished_succeeds() {
    let (mock, api) = shared(
        MockClusterApi::new()
            .with_statement_handles(["op-1"])
            .with_operation_statuses(
                "op-1",
                [
                    OperationStatus::Pending,
                    OperationStatus::Running,
                    OperationStatus::Finished,
                ],
            ),
    );
    let clock = clock();
    let executor = StatementExecutor::new(api, clock.clone(), &test_config());
    let statement = &StatementParser::new().parse("INSERT INTO a SELECT 1;")[0];

    assert!(executor.execute(statement, &gateway()).await);
    assert_eq!(status_polls(&mock), 3);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(2); 2]);
}

#[tokio::test]
async fn test_statement_sent_with_session_handle() {
    let (mock, api) = shared(
        MockClusterApi::new()
            .with_statement_handles(["op-1"])
            .with_operation_statuses("op-1", [OperationStatus::Finished]),
    );
    let executor = StatementExecutor::new(api, clock(), &test_config());
    let statement = &StatementParser::new().parse("SET 'a' = 'b';")[0];

    assert!(executor.execute(statement, &gateway()).await);
    assert_eq!(
        mock.calls()[0],
        MockCall::SubmitStatement {
            session: SessionHandle("sess-1".to_string()),
            statement: "SET 'a' = 'b'".to_string(),
        }
    );
}

#[tokio::test]
async fn test_error_status_fetches_diagnostics() {
    let (mock, api) = shared(
        MockClusterApi::new()
            .with_statement_handles(["op-1"])
            .with_operation_statuses("op-1", [OperationStatus::Running, OperationStatus::Error])
            .with_operation_result(serde_json::json!({ "errors": ["table not found"] })),
    );
    let executor = StatementExecutor::new(api, clock(), &test_config());
    let statement = &StatementParser::new().parse("INSERT INTO missing SELECT 1;")[0];

    assert!(!executor.execute(statement, &gateway()).await);
    assert_eq!(
        mock.count_calls(|c| *c == MockCall::OperationResult(OperationHandle("op-1".to_string()))),
        1
    );
}

#[tokio::test]
async fn test_unreadable_diagnostics_do_not_change_outcome() {
    let (_mock, api) = shared(
        MockClusterApi::new()
            .with_statement_handles(["op-1"])
            .with_operation_statuses("op-1", [OperationStatus::Canceled]),
    );
    let executor = StatementExecutor::new(api, clock(), &test_config());
    let statement = &StatementParser::new().parse("INSERT INTO t SELECT 1;")[0];
    assert!(!executor.execute(statement, &gateway()).await);
}

#[tokio::test]
async fn test_status_call_failure_fails_immediately() {
    let (mock, api) = shared(
        MockClusterApi::new()
            .with_statement_handles(["op-1"])
            .with_operation_status_failure("op-1", MockFailure::Status(500)),
    );
    let clock = clock();
    let executor = StatementExecutor::new(api, clock.clone(), &test_config());
    let statement = &StatementParser::new().parse("INSERT INTO t SELECT 1;")[0];

    assert!(!executor.execute(statement, &gateway()).await);
    assert_eq!(status_polls(&mock), 1);
    assert_eq!(clock.sleep_count(), 0);
    assert_eq!(
        mock.count_calls(|c| matches!(c, MockCall::OperationResult(_))),
        0
    );
}

#[tokio::test]
async fn test_submit_failure_is_statement_failure() {
    let (mock, api) = shared(MockClusterApi::new().with_statement_failure(MockFailure::Status(400)));
    let executor = StatementExecutor::new(api, clock(), &test_config());
    let statement = &StatementParser::new().parse("NOT SQL;")[0];

    assert!(!executor.execute(statement, &gateway()).await);
    assert_eq!(status_polls(&mock), 0);
}

#[tokio::test]
async fn test_operation_times_out() {
    let (mock, api) = shared(
        MockClusterApi::new()
            .with_statement_handles(["op-1"])
            .with_operation_statuses("op-1", [OperationStatus::Running]),
    );
    let clock = clock();
    let executor = StatementExecutor::new(api, clock.clone(), &test_config());
    let statement = &StatementParser::new().parse("INSERT INTO t SELECT 1;")[0];

    assert!(!executor.execute(statement, &gateway()).await);
    // Polls at t = 0, 2, ..., 118
    assert_eq!(status_polls(&mock), 60);
    assert_eq!(clock.elapsed(), Duration::from_secs(120));
}

#[tokio::test]
async fn test_unknown_status_keeps_polling() {
    let (mock, api) = shared(
        MockClusterApi::new()
            .with_statement_handles(["op-1"])
            .with_operation_statuses(
                "op-1",
                [OperationStatus::Unknown, OperationStatus::Finished],
            ),
    );
    let clock = clock();
    let executor = StatementExecutor::new(api, clock.clone(), &test_config());
    let statement = &StatementParser::new().parse("INSERT INTO t SELECT 1;")[0];

    assert!(executor.execute(statement, &gateway()).await);
    assert_eq!(status_polls(&mock), 2);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
}

#[tokio::test]
async fn test_tolerant_file_continues_after_failure() {
    let (mock, api) = shared(
        MockClusterApi::new()
            .with_statement_handles(["op-1", "op-2", "op-3"])
            .with_operation_statuses("op-1", [OperationStatus::Finished])
            .with_operation_statuses("op-2", [OperationStatus::Error])
            .with_operation_statuses("op-3", [OperationStatus::Finished]),
    );
    let clock = clock();
    let executor = StatementExecutor::new(api, clock.clone(), &test_config());

    let report = executor
        .execute_script(THREE_DDL, "create_tables.sql", &gateway(), FailurePolicy::Tolerant)
        .await;

    assert!(report.is_success());
    assert_eq!(report.total, 3);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, vec![1]);
    assert!(!report.aborted);
    assert_eq!(mock.submitted_statements().len(), 3);
    // Pacing only between statements
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(3); 2]);
}

#[tokio::test]
async fn test_strict_file_aborts_at_first_failure() {
    let (mock, api) = shared(
        MockClusterApi::new()
            .with_statement_handles(["op-1", "op-2", "op-3"])
            .with_operation_statuses("op-1", [OperationStatus::Finished])
            .with_operation_statuses("op-2", [OperationStatus::Error])
            .with_operation_statuses("op-3", [OperationStatus::Finished]),
    );
    let executor = StatementExecutor::new(api, clock(), &test_config());

    let report = executor
        .execute_script(THREE_DDL, "streaming_job.sql", &gateway(), FailurePolicy::Strict)
        .await;

    assert!(!report.is_success());
    assert!(report.aborted);
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, vec![1]);
    assert_eq!(
        mock.submitted_statements(),
        vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]
    );
    assert_eq!(
        report.to_string(),
        "Executed 1/3 statements from streaming_job.sql (aborted after statement 2)"
    );
}

#[tokio::test]
async fn test_all_statements_failing_is_failure() {
    let (_mock, api) = shared(MockClusterApi::new());
    let executor = StatementExecutor::new(api, clock(), &test_config());

    let report = executor
        .execute_script(THREE_DDL, "create_tables.sql", &gateway(), FailurePolicy::Tolerant)
        .await;
    assert!(!report.is_success());
    assert_eq!(report.failed, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_empty_script_is_failure() {
    let (_mock, api) = shared(MockClusterApi::new());
    let executor = StatementExecutor::new(api, clock(), &test_config());

    let report = executor
        .execute_script("-- nothing here\n", "empty.sql", &gateway(), FailurePolicy::Tolerant)
        .await;
    assert_eq!(report.total, 0);
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_direct_mode_never_calls_the_gateway() {
    let (mock, api) = shared(MockClusterApi::new());
    let executor = StatementExecutor::new(api, clock(), &test_config());
    let script = "CREATE CATALOG ice WITH ('type'='iceberg');\nCREATE TABLE t (id INT);\nINSERT INTO t SELECT 1;\n";

    let report = executor
        .execute_script(script, "mixed.sql", &Session::Direct, FailurePolicy::Tolerant)
        .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, vec![2]);
    assert!(report.is_success());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_execute_file_reports_file_name() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "CREATE TABLE a (id INT);").unwrap();
    let (_mock, api) = shared(
        MockClusterApi::new()
            .with_statement_handles(["op-1"])
            .with_operation_statuses("op-1", [OperationStatus::Finished]),
    );
    let executor = StatementExecutor::new(api, clock(), &test_config());

    let report = executor
        .execute_file(file.path(), &gateway(), FailurePolicy::Strict)
        .await
        .unwrap();
    assert!(report.is_success());
    assert_eq!(
        report.source,
        file.path().file_name().unwrap().to_string_lossy()
    );
}

#[tokio::test]
async fn test_execute_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let (_mock, api) = shared(MockClusterApi::new());
    let executor = StatementExecutor::new(api, clock(), &test_config());
    assert!(
        executor
            .execute_file(&dir.path().join("nope.sql"), &gateway(), FailurePolicy::Strict)
            .await
            .is_err()
    );
}
