//! Unit tests for the job monitor loop
//!
//! Tests cover:
//! - Idle-stop after consecutive empty listings
//! - Idle counter reset on a non-empty listing
//! - Terminal-state removal
//! - Listing errors and error backoff
//! - Interruption

use crate::unit::common::{InterruptingClock, clock, job, shared, test_config};
use flinkpilot::flinkpilot::cluster::{MockCall, MockFailure};
use flinkpilot::flinkpilot::monitor::CycleOutcome;
use flinkpilot::{
    JobMonitor, JobState, MockClusterApi, MonitorStopReason, ShutdownCoordinator,
};
use std::sync::Arc;
use std::time::Duration;

fn list_calls(mock: &MockClusterApi) -> usize {
    mock.count_calls(|c| *c == MockCall::ListJobs)
}

#[tokio::test]
async fn test_ten_empty_listings_stop_the_monitor() {
    let (mock, api) = shared(MockClusterApi::new().with_jobs(vec![]));
    let clock = clock();
    let coordinator = ShutdownCoordinator::new();
    let mut listener = coordinator.subscribe();

    let mut monitor = JobMonitor::new(api, clock.clone(), &test_config());
    let report = monitor.run(&mut listener).await;

    assert_eq!(report.stop_reason, MonitorStopReason::Idle);
    assert_eq!(report.cycles, 10);
    assert_eq!(list_calls(&mock), 10);
    // No sleep after the final check
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(30); 9]);
}

#[tokio::test]
async fn test_non_empty_listing_resets_idle_counter() {
    let mock = MockClusterApi::new().with_job_state("j-1", JobState::Running);
    for _ in 0..3 {
        mock.push_jobs(Ok(vec![]));
    }
    mock.push_jobs(Ok(vec![job("j-1", "sink", JobState::Running)]));
    mock.push_jobs(Ok(vec![]));
    let (mock, api) = shared(mock);
    let coordinator = ShutdownCoordinator::new();
    let mut listener = coordinator.subscribe();

    let mut monitor = JobMonitor::new(api, clock(), &test_config());
    let report = monitor.run(&mut listener).await;

    assert_eq!(report.stop_reason, MonitorStopReason::Idle);
    // 3 idle, 1 active, then 10 idle
    assert_eq!(list_calls(&mock), 14);
    assert_eq!(report.still_tracked.len(), 1);
    assert_eq!(report.still_tracked[0].name, "sink");
}

#[tokio::test]
async fn test_terminal_jobs_removed_on_the_cycle_they_are_seen() {
    let mock = MockClusterApi::new()
        .with_job_state("j-1", JobState::Running)
        .with_job_state("j-1", JobState::Finished)
        .with_job_state("j-2", JobState::Failed);
    mock.push_jobs(Ok(vec![
        job("j-1", "enrich", JobState::Running),
        job("j-2", "aggregate", JobState::Running),
    ]));
    mock.push_jobs(Ok(vec![]));
    let (_mock, api) = shared(mock);

    let mut monitor = JobMonitor::new(api, clock(), &test_config());

    assert_eq!(monitor.run_cycle().await, CycleOutcome::Active { running: 2 });
    assert!(monitor.is_tracking("enrich"));
    assert!(!monitor.is_tracking("aggregate"));
    assert_eq!(monitor.tracked()[0].last_state, JobState::Running);

    assert_eq!(
        monitor.run_cycle().await,
        CycleOutcome::Idle { consecutive: 1 }
    );
    assert!(monitor.tracked().is_empty());
}

#[tokio::test]
async fn test_report_separates_completed_and_failed() {
    let mock = MockClusterApi::new()
        .with_job_state("j-1", JobState::Finished)
        .with_job_state("j-2", JobState::Canceled);
    mock.push_jobs(Ok(vec![
        job("j-1", "backfill", JobState::Running),
        job("j-2", "audit", JobState::Running),
    ]));
    mock.push_jobs(Ok(vec![]));
    let (_mock, api) = shared(mock);
    let coordinator = ShutdownCoordinator::new();
    let mut listener = coordinator.subscribe();

    let mut monitor = JobMonitor::new(api, clock(), &test_config().with_max_idle_checks(1));
    let report = monitor.run(&mut listener).await;

    assert_eq!(report.completed, vec!["backfill".to_string()]);
    assert_eq!(
        report.failed,
        vec![("audit".to_string(), JobState::Canceled)]
    );
    assert!(report.still_tracked.is_empty());
}

#[tokio::test]
async fn test_listing_error_does_not_count_as_idle() {
    let mock = MockClusterApi::new();
    mock.push_jobs(Err(MockFailure::Transport));
    mock.push_jobs(Ok(vec![]));
    let (_mock, api) = shared(mock);

    let mut monitor = JobMonitor::new(api, clock(), &test_config());

    assert!(matches!(monitor.run_cycle().await, CycleOutcome::Error(_)));
    assert_eq!(monitor.idle_checks(), 0);
    assert_eq!(
        monitor.run_cycle().await,
        CycleOutcome::Idle { consecutive: 1 }
    );
}

#[tokio::test]
async fn test_listing_error_uses_error_backoff() {
    let mock = MockClusterApi::new();
    mock.push_jobs(Err(MockFailure::Status(503)));
    mock.push_jobs(Ok(vec![]));
    let (mock, api) = shared(mock);
    let clock = clock();
    let coordinator = ShutdownCoordinator::new();
    let mut listener = coordinator.subscribe();

    let mut monitor = JobMonitor::new(api, clock.clone(), &test_config().with_max_idle_checks(2));
    let report = monitor.run(&mut listener).await;

    assert_eq!(report.cycles, 3);
    assert_eq!(list_calls(&mock), 3);
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_secs(10), Duration::from_secs(30)]
    );
}

#[tokio::test]
async fn test_detail_error_keeps_record() {
    let (mock, api) = shared(
        MockClusterApi::new().with_jobs(vec![job("j-9", "ingest", JobState::Created)]),
    );

    let mut monitor = JobMonitor::new(api, clock(), &test_config());
    monitor.run_cycle().await;

    assert!(monitor.is_tracking("ingest"));
    assert_eq!(monitor.tracked()[0].last_state, JobState::Created);
    assert_eq!(
        mock.count_calls(|c| *c == MockCall::JobDetail("j-9".to_string())),
        1
    );
}

#[tokio::test]
async fn test_jobs_tracked_by_name() {
    let mock = MockClusterApi::new()
        .with_job_state("j-1", JobState::Running)
        .with_job_state("j-2", JobState::Running);
    mock.push_jobs(Ok(vec![job("j-1", "sink", JobState::Running)]));
    mock.push_jobs(Ok(vec![job("j-2", "sink", JobState::Running)]));
    let (_mock, api) = shared(mock);

    let mut monitor = JobMonitor::new(api, clock(), &test_config());
    monitor.run_cycle().await;
    monitor.run_cycle().await;

    let tracked = monitor.tracked();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].job_id, "j-2");
}

#[tokio::test]
async fn test_interrupt_stops_monitor() {
    let (mock, api) = shared(
        MockClusterApi::new()
            .with_jobs(vec![job("j-1", "sink", JobState::Running)])
            .with_job_state("j-1", JobState::Running),
    );
    let coordinator = ShutdownCoordinator::new();
    let mut listener = coordinator.subscribe();
    let clock = Arc::new(InterruptingClock::new(coordinator.clone(), 2));

    let mut monitor = JobMonitor::new(api, clock, &test_config());
    let report = monitor.run(&mut listener).await;

    assert_eq!(report.stop_reason, MonitorStopReason::Interrupted);
    assert_eq!(report.cycles, 2);
    assert_eq!(list_calls(&mock), 2);
    assert_eq!(report.still_tracked.len(), 1);
}

#[tokio::test]
async fn test_terminal_listing_entries_are_never_tracked() {
    // The JobManager keeps finished jobs in its listing
    let (mock, api) = shared(
        MockClusterApi::new()
            .with_jobs(vec![job("j-1", "audit", JobState::Canceled)])
            .with_job_state("j-1", JobState::Canceled),
    );
    let coordinator = ShutdownCoordinator::new();
    let mut listener = coordinator.subscribe();

    let mut monitor = JobMonitor::new(api, clock(), &test_config());
    let report = monitor.run(&mut listener).await;

    assert_eq!(report.stop_reason, MonitorStopReason::Idle);
    assert_eq!(report.cycles, 10);
    assert!(report.failed.is_empty());
    assert!(report.still_tracked.is_empty());
    assert_eq!(
        mock.count_calls(|c| matches!(c, MockCall::JobDetail(_))),
        0
    );
}

#[tokio::test]
async fn test_failed_listing_entry_counts_as_idle_without_detail() {
    let (_mock, api) = shared(
        MockClusterApi::new().with_jobs(vec![job("j-1", "audit", JobState::Failed)]),
    );

    let mut monitor = JobMonitor::new(api, clock(), &test_config());

    assert_eq!(
        monitor.run_cycle().await,
        CycleOutcome::Idle { consecutive: 1 }
    );
    assert!(monitor.tracked().is_empty());
}

#[tokio::test]
async fn test_tracked_job_listed_as_terminal_is_reported_once() {
    let mock = MockClusterApi::new().with_job_state("j-1", JobState::Running);
    mock.push_jobs(Ok(vec![job("j-1", "audit", JobState::Running)]));
    mock.push_jobs(Ok(vec![job("j-1", "audit", JobState::Failed)]));
    let (mock, api) = shared(mock);
    let coordinator = ShutdownCoordinator::new();
    let mut listener = coordinator.subscribe();

    let mut monitor = JobMonitor::new(api, clock(), &test_config().with_max_idle_checks(3));
    let report = monitor.run(&mut listener).await;

    assert_eq!(report.stop_reason, MonitorStopReason::Idle);
    assert_eq!(report.failed, vec![("audit".to_string(), JobState::Failed)]);
    assert!(report.still_tracked.is_empty());
    // Detail is only read on the cycle the job was listed as running
    assert_eq!(
        mock.count_calls(|c| matches!(c, MockCall::JobDetail(_))),
        1
    );
}

#[tokio::test]
async fn test_restarted_job_replaces_terminal_run() {
    let (_mock, api) = shared(
        MockClusterApi::new()
            .with_jobs(vec![
                job("j-old", "sink", JobState::Canceled),
                job("j-new", "sink", JobState::Running),
            ])
            .with_job_state("j-new", JobState::Running),
    );

    let mut monitor = JobMonitor::new(api, clock(), &test_config());

    assert_eq!(monitor.run_cycle().await, CycleOutcome::Active { running: 1 });
    let tracked = monitor.tracked();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].job_id, "j-new");
}
