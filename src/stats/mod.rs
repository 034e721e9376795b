//! Run statistics
//!
//! Session tasks never share counters. Each one produces a
//! [`TaskResult`](crate::task::TaskResult), and the single-owner
//! [`Aggregator`](aggregator::Aggregator) folds them into a [`Summary`] in
//! whatever order they arrive. All folds are sums, set unions and histogram
//! records, so the order does not change the result.
//!
//! Rates are derived once at the end, from the totals and the wall-clock
//! elapsed time measured by the scheduler. A zero elapsed time or an empty run
//! yields zero rates and raises [`Summary::no_data_moved`], never NaN or
//! infinity.

pub mod aggregator;
pub mod histogram;

use crate::config::Mode;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Fixed operation size used to derive IOPS from bytes
pub const IOP_SIZE: u64 = 4096;

/// Totals for one mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeTotals {
    pub tasks: usize,
    pub completed: usize,
    pub bytes_moved: u64,
    pub bytes_written: u64,
    pub files_churned: u64,
}

/// Percentiles of session task lifetimes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionLifetimes {
    pub p50: Option<Duration>,
    pub p90: Option<Duration>,
    pub p99: Option<Duration>,
    pub max: Option<Duration>,
}

/// Run-level summary
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Host that ran this instance
    pub hostname: String,
    pub tasks_attempted: usize,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    /// Tasks that connected and attached
    pub sessions_established: usize,
    /// Tasks that failed to connect or attach
    pub sessions_failed: usize,
    pub bytes_moved: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub files_churned: u64,
    pub skipped_reads: u64,
    pub elapsed: Duration,
    /// Bytes moved per second
    pub throughput: f64,
    /// Bytes written per second
    pub write_throughput: f64,
    /// Bytes moved / [`IOP_SIZE`] per second
    pub iops: f64,
    pub modes: BTreeSet<Mode>,
    pub per_mode: BTreeMap<Mode, ModeTotals>,
    pub session_lifetimes: SessionLifetimes,
    /// Fail-fast ended the run before every result arrived
    pub stopped_early: bool,
    /// Nothing completed or no bytes moved; `throughput` and `iops` are zero
    pub no_data_moved: bool,
}

impl Summary {
    /// Every attempted task completed
    pub fn all_completed(&self) -> bool {
        self.tasks_completed == self.tasks_attempted
    }

    /// No bytes went over the wire in either direction
    pub fn is_idle(&self) -> bool {
        self.no_data_moved && self.bytes_written == 0
    }
}

/// Name of this host, for telling instance summaries apart
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_hostname_not_empty() {
        assert!(!local_hostname().is_empty());
    }
}
