//! Result aggregation
//!
//! Folds task results into a [`Summary`] as they arrive.
//!
//! # Example
//!
//! ```
//! use tempest::config::Mode;
//! use tempest::stats::aggregator::Aggregator;
//! use tempest::task::{TaskPhase, TaskResult};
//! use tempest::workload::WorkloadOutcome;
//! use std::time::Duration;
//!
//! let mut aggregator = Aggregator::new(2);
//! let outcome = WorkloadOutcome { bytes_read: 8192, ..Default::default() };
//! aggregator.add(&TaskResult::completed(0, Mode::ReadIops, 8192, outcome, Duration::from_secs(1)));
//! aggregator.add(&TaskResult::failed(1, Mode::ReadIops, TaskPhase::Connect, "refused", Duration::ZERO));
//!
//! let summary = aggregator.finish(Duration::from_secs(2));
//! assert_eq!(summary.tasks_completed, 1);
//! assert_eq!(summary.sessions_failed, 1);
//! assert_eq!(summary.iops, 1.0);
//! ```

use super::histogram::DurationHistogram;
use super::{ModeTotals, SessionLifetimes, Summary, IOP_SIZE};
use crate::config::Mode;
use crate::task::TaskResult;
use crate::util::time::calculate_throughput;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Single-owner fold of task results
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    hostname: String,
    attempted: usize,
    results: usize,
    completed: usize,
    failed: usize,
    sessions_failed: usize,
    bytes_moved: u64,
    bytes_read: u64,
    bytes_written: u64,
    files_churned: u64,
    skipped_reads: u64,
    modes: BTreeSet<Mode>,
    per_mode: BTreeMap<Mode, ModeTotals>,
    lifetimes: DurationHistogram,
    stopped_early: bool,
}

impl Aggregator {
    /// Aggregator for a run that dispatched `attempted` tasks
    pub fn new(attempted: usize) -> Self {
        Self {
            attempted,
            ..Default::default()
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Mark the run as cut short by fail-fast
    pub fn set_stopped_early(&mut self, stopped: bool) {
        self.stopped_early = stopped;
    }

    /// Fold one result
    pub fn add(&mut self, result: &TaskResult) {
        self.results += 1;
        self.modes.insert(result.mode);
        self.lifetimes.record(result.duration);

        let totals = self.per_mode.entry(result.mode).or_default();
        totals.tasks += 1;

        match &result.failure {
            None => {
                self.completed += 1;
                self.bytes_moved += result.bytes_transferred;
                self.bytes_read += result.bytes_read;
                self.bytes_written += result.bytes_written;
                self.files_churned += result.files_created;
                self.skipped_reads += result.skipped_reads;

                totals.completed += 1;
                totals.bytes_moved += result.bytes_transferred;
                totals.bytes_written += result.bytes_written;
                totals.files_churned += result.files_created;
            }
            Some(failure) => {
                self.failed += 1;
                if failure.phase.is_session_setup() {
                    self.sessions_failed += 1;
                }
            }
        }
    }

    /// Derive rates and produce the summary
    pub fn finish(&self, elapsed: Duration) -> Summary {
        let no_data_moved = self.completed == 0 || elapsed.is_zero() || self.bytes_moved == 0;

        let (throughput, iops) = if no_data_moved {
            (0.0, 0.0)
        } else {
            let throughput = calculate_throughput(self.bytes_moved, elapsed);
            (throughput, throughput / IOP_SIZE as f64)
        };
        // Reported alongside, even for runs that moved nothing
        let write_throughput = if self.completed == 0 {
            0.0
        } else {
            calculate_throughput(self.bytes_written, elapsed)
        };

        Summary {
            hostname: self.hostname.clone(),
            tasks_attempted: self.attempted.max(self.results),
            tasks_completed: self.completed,
            tasks_failed: self.failed,
            sessions_established: self.results - self.sessions_failed,
            sessions_failed: self.sessions_failed,
            bytes_moved: self.bytes_moved,
            bytes_read: self.bytes_read,
            bytes_written: self.bytes_written,
            files_churned: self.files_churned,
            skipped_reads: self.skipped_reads,
            elapsed,
            throughput,
            write_throughput,
            iops,
            modes: self.modes.clone(),
            per_mode: self.per_mode.clone(),
            session_lifetimes: SessionLifetimes {
                p50: self.lifetimes.percentile(50.0),
                p90: self.lifetimes.percentile(90.0),
                p99: self.lifetimes.percentile(99.0),
                max: self.lifetimes.max(),
            },
            stopped_early: self.stopped_early,
            no_data_moved,
        }
    }
}
