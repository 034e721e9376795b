//! Read IOPS: many small reads at offset 0
//!
//! Stresses the server's request rate rather than data volume.

use super::{ensure_directory, seed_if_missing, WorkloadContext, WorkloadOutcome, WorkloadStrategy};
use crate::config::Mode;
use crate::session::{with_file, AccessIntent, CreateDisposition, SessionError, SessionResult};
use crate::util::retry::with_retry;

/// Size of every read-iops request
pub const IOPS_READ_SIZE: usize = 4096;

pub struct ReadIops;

impl WorkloadStrategy for ReadIops {
    fn mode(&self) -> Mode {
        Mode::ReadIops
    }

    fn prepare(&self, ctx: &WorkloadContext<'_>) -> SessionResult<String> {
        ensure_directory(ctx.tree, ctx.client_dir, &ctx.retry);
        let path = ctx.working_file(self.mode());
        seed_if_missing(ctx, &path)?;
        Ok(path)
    }

    fn run(&self, ctx: &WorkloadContext<'_>, path: &str) -> SessionResult<WorkloadOutcome> {
        let handle = with_retry(&ctx.retry, "open for read", || {
            ctx.tree.open(path, AccessIntent::Read, CreateDisposition::OpenExisting)
        })?;

        let bytes_read = with_file(handle, |file| {
            let mut total = 0u64;
            for _ in 0..ctx.workload.iops_reads {
                let data = with_retry(&ctx.retry, "iops read", || match file.read_at(0, IOPS_READ_SIZE) {
                    Err(SessionError::EndOfFile) => Ok(Vec::new()),
                    other => other,
                })?;
                total += data.len() as u64;
            }
            Ok(total)
        })?;

        tracing::debug!(
            "Task {}: {} reads returned {} bytes",
            ctx.task_index,
            ctx.workload.iops_reads,
            bytes_read
        );
        Ok(WorkloadOutcome {
            bytes_read,
            ..Default::default()
        })
    }
}
