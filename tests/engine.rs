//! End-to-end runs of the engine against the in-memory share

use std::sync::Arc;
use tempest::config::{Config, Mode};
use tempest::session::mock::MockConnector;
use tempest::session::ShareConnector;
use tempest::task::TaskPhase;
use tempest::{run_load, RunReport};

const MIB: u64 = 1024 * 1024;

fn config(mode: Mode, num_tasks: usize) -> Config {
    let mut config = Config::default();
    config.share.server = "fileserver".to_string();
    config.share.share = "load".to_string();
    config.runtime.client_id = "2f1d7c9e-test-client".to_string();
    config.runtime.retry.max_attempts = 3;
    config.runtime.retry.delay_ms = 0;
    config.workload.mode = mode;
    config.workload.num_tasks = num_tasks;
    config.workload.block_size = MIB;
    config.workload.max_file_size = 10 * MIB;
    config
}

fn run(config: Config, connector: &MockConnector) -> RunReport {
    let config = Arc::new(config);
    let connector: Arc<dyn ShareConnector> = Arc::new(connector.clone());
    run_load(&config, connector, |_| {})
}

#[test]
fn test_streaming_writes_end_to_end() {
    let connector = MockConnector::new();
    let report = run(config(Mode::StreamingWrites, 5), &connector);
    let summary = &report.summary;

    assert_eq!(summary.tasks_completed, 5);
    assert_eq!(summary.bytes_moved, 0);
    assert_eq!(summary.bytes_written, 5 * 10 * MIB);
    assert_eq!(summary.files_churned, 0);
    // Writes are not moved bytes; write throughput is still reported
    assert!(summary.no_data_moved);
    assert_eq!(summary.throughput, 0.0);
    assert!(summary.write_throughput > 0.0);
    assert!(!summary.is_idle());
    for index in 0..5 {
        let path = format!("2f1d7c9e-test-client/tempest_stream_write.{}", index);
        assert_eq!(connector.file_size(&path), Some(10 * MIB));
    }
    assert_eq!(connector.session_disconnects(), 5);
    assert_eq!(connector.open_handles(), 0);
}

#[test]
fn test_default_mode_end_to_end() {
    let connector = MockConnector::new();
    let report = run(config(Mode::Default, 5), &connector);
    let summary = &report.summary;

    assert_eq!(summary.tasks_completed, 5);
    assert_eq!(summary.bytes_moved, 5 * 10 * MIB);
    assert!((50..50_000).contains(&summary.files_churned));
    assert_eq!(summary.modes.iter().collect::<Vec<_>>(), vec![&Mode::Default]);

    // Read-back covers at least the size-verification tolerance
    for result in &report.results {
        assert!(result.bytes_read * 10 >= 10 * MIB * 9);
    }
    // Every churn file was deleted; only the five large files remain
    assert_eq!(connector.file_count(), 5);
}

#[test]
fn test_random_io_pure_writes_and_pure_reads() {
    let connector = MockConnector::new();
    let mut writes = config(Mode::RandomIo, 3);
    writes.workload.block_size = 64 * 1024;
    writes.workload.random_ops = 40;
    writes.workload.read_percent = 0;
    let report = run(writes.clone(), &connector);
    for result in &report.results {
        assert_eq!(result.bytes_written, 40 * 64 * 1024);
        assert_eq!(result.bytes_read, 0);
    }

    let mut reads = writes;
    reads.workload.read_percent = 100;
    let report = run(reads, &connector);
    for result in &report.results {
        assert_eq!(result.bytes_written, 0);
        assert_eq!(result.bytes_read, 40 * 64 * 1024);
    }
}

#[test]
fn test_result_count_matches_tasks_despite_failures() {
    let connector = MockConnector::new();
    connector.set_connect_failures(u32::MAX);
    let report = run(config(Mode::StreamingReads, 7), &connector);

    assert_eq!(report.results.len(), 7);
    assert!(report.results.iter().all(|r| !r.is_success()));
    assert!(report
        .results
        .iter()
        .all(|r| r.failure.as_ref().map(|f| f.phase) == Some(TaskPhase::Connect)));
    assert_eq!(report.summary.sessions_failed, 7);
    assert!(report.summary.no_data_moved);
    assert_eq!(report.summary.throughput, 0.0);
}

#[test]
fn test_transient_failures_absorbed_by_retry() {
    let connector = MockConnector::new();
    connector.set_transient_failures(2);
    let mut config = config(Mode::ReadIops, 4);
    config.workload.iops_reads = 100;
    let report = run(config, &connector);

    assert_eq!(report.summary.tasks_completed, 4);
    assert_eq!(report.summary.bytes_moved, 4 * 100 * 4096);
}

#[test]
fn test_fail_fast_still_releases_every_session() {
    let connector = MockConnector::new();
    connector.set_fail_attach(true);
    let mut config = config(Mode::Default, 8);
    config.runtime.fail_fast = true;
    let report = run(config, &connector);

    assert!(report.summary.stopped_early);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.summary.tasks_attempted, 8);
    assert!(report.summary.no_data_moved);
    // In-flight tasks were joined and released their sessions
    assert_eq!(connector.session_disconnects(), 8);
}

#[test]
fn test_zero_tasks() {
    let connector = MockConnector::new();
    let report = run(config(Mode::Default, 0), &connector);

    assert!(report.results.is_empty());
    assert_eq!(report.summary.tasks_attempted, 0);
    assert!(report.summary.no_data_moved);
    assert_eq!(report.summary.iops, 0.0);
}
