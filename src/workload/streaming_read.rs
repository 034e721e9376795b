//! Streaming read: the whole file as concurrent block-range reads
//!
//! The file is cut into contiguous block-sized ranges from offset 0 to end of
//! file. A group of scoped reader threads, bounded by `read_workers`, pulls
//! ranges from a shared cursor; the group lives only for this one read, so a
//! task never has more than `read_workers` readers in flight. Range results
//! complete in any order and are summed.

use super::{ensure_directory, seed_if_missing, WorkloadContext, WorkloadOutcome, WorkloadStrategy};
use crate::config::Mode;
use crate::session::{with_file, AccessIntent, CreateDisposition, RemoteFile, SessionError, SessionResult};
use crate::util::retry::{with_retry, RetryPolicy};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

pub struct StreamingRead;

impl WorkloadStrategy for StreamingRead {
    fn mode(&self) -> Mode {
        Mode::StreamingReads
    }

    fn prepare(&self, ctx: &WorkloadContext<'_>) -> SessionResult<String> {
        ensure_directory(ctx.tree, ctx.client_dir, &ctx.retry);
        let path = ctx.working_file(self.mode());
        seed_if_missing(ctx, &path)?;
        Ok(path)
    }

    fn run(&self, ctx: &WorkloadContext<'_>, path: &str) -> SessionResult<WorkloadOutcome> {
        let bytes_read = read_file(ctx, path)?;
        Ok(WorkloadOutcome {
            bytes_read,
            ..Default::default()
        })
    }
}

/// Read all of `path`, returning the bytes received
pub fn read_file(ctx: &WorkloadContext<'_>, path: &str) -> SessionResult<u64> {
    let handle = with_retry(&ctx.retry, "open for read", || {
        ctx.tree.open(path, AccessIntent::Read, CreateDisposition::OpenExisting)
    })?;

    let total = with_file(handle, |file| {
        let size = with_retry(&ctx.retry, "query size", || file.end_of_file())?;
        let ranges = BlockRanges::new(size, ctx.workload.block_size);
        read_ranges(file, ranges, ctx.workload.read_workers, &ctx.retry)
    })?;

    tracing::debug!("Task {}: read {} bytes from {}", ctx.task_index, total, path);
    Ok(total)
}

/// Contiguous block-sized ranges covering `[0, size)`, computed by index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRanges {
    size: u64,
    block_size: u64,
}

impl BlockRanges {
    pub fn new(size: u64, block_size: u64) -> Self {
        Self {
            size,
            block_size: block_size.max(1),
        }
    }

    pub fn len(&self) -> u64 {
        self.size.div_ceil(self.block_size)
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// `(offset, length)` of range `index`, `None` past the end
    pub fn get(&self, index: u64) -> Option<(u64, u64)> {
        let offset = index.checked_mul(self.block_size)?;
        if offset >= self.size {
            return None;
        }
        Some((offset, self.block_size.min(self.size - offset)))
    }
}

fn read_ranges(
    file: &dyn RemoteFile,
    ranges: BlockRanges,
    workers: usize,
    policy: &RetryPolicy,
) -> SessionResult<u64> {
    if ranges.is_empty() {
        return Ok(0);
    }

    let workers = (workers.max(1) as u64).min(ranges.len()) as usize;
    let cursor = AtomicU64::new(0);
    let failed = AtomicBool::new(false);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| -> SessionResult<u64> {
                    let mut sum = 0;
                    while !failed.load(Ordering::Relaxed) {
                        let index = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some((offset, len)) = ranges.get(index) else {
                            break;
                        };
                        match read_range(file, offset, len, policy) {
                            Ok(n) => sum += n,
                            Err(e) => {
                                failed.store(true, Ordering::Relaxed);
                                return Err(e);
                            }
                        }
                    }
                    Ok(sum)
                })
            })
            .collect();

        let mut total = 0;
        let mut first_error = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(n)) => total += n,
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    first_error.get_or_insert(SessionError::Permanent("range reader panicked".to_string()));
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    })
}

/// Read one range; an empty read or end of file ends the range early
fn read_range(file: &dyn RemoteFile, offset: u64, len: u64, policy: &RetryPolicy) -> SessionResult<u64> {
    let end = offset + len;
    let mut pos = offset;
    while pos < end {
        let data = with_retry(policy, "read range", || match file.read_at(pos, (end - pos) as usize) {
            Err(SessionError::EndOfFile) => Ok(Vec::new()),
            other => other,
        })?;
        if data.is_empty() {
            break;
        }
        pos += data.len() as u64;
    }
    Ok(pos - offset)
}
