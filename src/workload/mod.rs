//! Workload strategies
//!
//! A workload strategy is the access pattern one session task drives against
//! its attached share. Every strategy has two steps:
//!
//! - **prepare**: ensure the per-client working directory exists, make sure
//!   the working file is usable, and return its share-relative path
//! - **run**: issue the pattern's operations against that file and report
//!   what moved
//!
//! Every remote operation inside a strategy goes through
//! [`with_retry`](crate::util::retry::with_retry) explicitly at its call site;
//! nothing is retried implicitly.
//!
//! # Strategies
//!
//! - [`streaming_write::StreamingWrite`]: sequential block writes up to the file size
//! - [`streaming_read::StreamingRead`]: concurrent block-range reads of the whole file
//! - [`read_iops::ReadIops`]: many 4 KiB reads at offset 0
//! - [`random_io::RandomIo`]: reads and writes at uniformly random offsets
//! - [`churn::Churn`]: write, read back, then create and delete many small files

pub mod churn;
pub mod random_io;
pub mod read_iops;
pub mod streaming_read;
pub mod streaming_write;

use crate::config::{Mode, WorkloadConfig};
use crate::session::{
    join_path, with_file, AccessIntent, CreateDisposition, SessionError, SessionResult, ShareTree,
};
use crate::util::retry::{with_retry, RetryPolicy};

/// Everything a strategy needs from its owning task
pub struct WorkloadContext<'a> {
    /// Attached share
    pub tree: &'a dyn ShareTree,
    pub workload: &'a WorkloadConfig,
    /// Policy applied to every remote operation
    pub retry: RetryPolicy,
    /// Policy applied to written-size verification
    pub verify: RetryPolicy,
    /// Per-client working directory (the client id)
    pub client_dir: &'a str,
    pub task_index: usize,
}

impl<'a> WorkloadContext<'a> {
    /// Working file of this task: `<client_dir>/<prefix>.<task_index>`
    pub fn working_file(&self, mode: Mode) -> String {
        join_path(
            self.client_dir,
            &format!("{}.{}", mode.file_prefix(), self.task_index),
        )
    }

    pub fn block_size(&self) -> usize {
        self.workload.block_size as usize
    }
}

/// Counters produced by one strategy run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkloadOutcome {
    pub bytes_read: u64,
    pub bytes_written: u64,
    /// Churn files created
    pub files_created: u64,
    /// Random-io reads that failed and were skipped
    pub skipped_reads: u64,
}

/// Access pattern driven by a session task
pub trait WorkloadStrategy: Send + Sync {
    fn mode(&self) -> Mode;

    /// Make the working file ready and return its path
    ///
    /// Implementations must ensure the client directory first.
    fn prepare(&self, ctx: &WorkloadContext<'_>) -> SessionResult<String>;

    /// Run the pattern against `path`
    fn run(&self, ctx: &WorkloadContext<'_>, path: &str) -> SessionResult<WorkloadOutcome>;

    /// Bytes this pattern reports as moved
    ///
    /// Reads only by default; writes are tracked separately.
    fn moved_bytes(&self, outcome: &WorkloadOutcome) -> u64 {
        outcome.bytes_read
    }
}

/// Strategy for a mode
pub fn strategy_for(mode: Mode) -> Box<dyn WorkloadStrategy> {
    match mode {
        Mode::StreamingWrites => Box::new(streaming_write::StreamingWrite),
        Mode::StreamingReads => Box::new(streaming_read::StreamingRead),
        Mode::ReadIops => Box::new(read_iops::ReadIops),
        Mode::RandomIo => Box::new(random_io::RandomIo),
        Mode::Default => Box::new(churn::Churn),
    }
}

/// Ensure the client working directory exists
///
/// Idempotent open-or-create. A failure is logged and reported as `false`;
/// later opens inside the directory fail loudly if it is really unusable.
pub fn ensure_directory(tree: &dyn ShareTree, dir: &str, policy: &RetryPolicy) -> bool {
    let result = with_retry(policy, "ensure directory", || {
        let handle = tree.open(dir, AccessIntent::Read, CreateDisposition::OpenOrCreateDirectory)?;
        handle.close()
    });
    match result {
        Ok(()) => {
            tracing::debug!("Directory {} ready", dir);
            true
        }
        Err(e) => {
            tracing::warn!("Could not ensure directory {}: {}", dir, e);
            false
        }
    }
}

/// Whether `path` exists on the share
pub fn file_exists(tree: &dyn ShareTree, path: &str, policy: &RetryPolicy) -> SessionResult<bool> {
    with_retry(policy, "probe file", || {
        match tree.open(path, AccessIntent::Read, CreateDisposition::OpenExisting) {
            Ok(handle) => handle.close().map(|_| true),
            Err(SessionError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    })
}

/// Seed a read-only working file with a streaming write when it is missing
///
/// Returns the number of bytes written; they are not counted as moved.
pub fn seed_if_missing(ctx: &WorkloadContext<'_>, path: &str) -> SessionResult<u64> {
    if file_exists(ctx.tree, path, &ctx.retry)? {
        return Ok(0);
    }
    tracing::info!(
        "Task {}: seeding {} with {} bytes",
        ctx.task_index,
        path,
        ctx.workload.max_file_size
    );
    streaming_write::write_file(ctx, path, ctx.workload.max_file_size)
}

/// Current size of `path`, read through a fresh handle
pub fn remote_file_size(tree: &dyn ShareTree, path: &str) -> SessionResult<u64> {
    let handle = tree.open(path, AccessIntent::Read, CreateDisposition::OpenExisting)?;
    with_file(handle, |f| f.end_of_file())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::session::mock::MockConnector;
    use crate::session::{Credentials, ShareConnector};
    use std::sync::Arc;
    use std::time::Duration;

    pub const CLIENT: &str = "client-0";

    pub fn attach(connector: &MockConnector) -> Arc<dyn ShareTree> {
        let mut session = connector.connect("server", &Credentials::default()).unwrap();
        session.attach("share").unwrap()
    }

    pub fn small_workload(mode: Mode) -> WorkloadConfig {
        WorkloadConfig {
            mode,
            block_size: 1024,
            max_file_size: 10 * 1024,
            iops_reads: 20,
            random_ops: 50,
            read_workers: 4,
            churn_min: 3,
            churn_max: 6,
            ..Default::default()
        }
    }

    pub fn context<'a>(tree: &'a dyn ShareTree, workload: &'a WorkloadConfig) -> WorkloadContext<'a> {
        WorkloadContext {
            tree,
            workload,
            retry: RetryPolicy::new(3, Duration::ZERO),
            verify: RetryPolicy::new(2, Duration::ZERO),
            client_dir: CLIENT,
            task_index: 0,
        }
    }
}
