//! Random IO: mixed reads and writes at uniformly random offsets
//!
//! Offsets are drawn from `[0, max_file_size - block_size]`. Each operation is
//! a read with probability `read_percent / 100`, otherwise a write of fresh
//! random bytes. A failed read is counted and skipped: sparse or unallocated
//! ranges are expected on a freshly seeded file.

use super::{ensure_directory, seed_if_missing, WorkloadContext, WorkloadOutcome, WorkloadStrategy};
use crate::config::Mode;
use crate::session::{with_file, AccessIntent, CreateDisposition, SessionError, SessionResult};
use crate::util::buffer::{FillPattern, PayloadGenerator};
use crate::util::retry::with_retry;
use rand::distributions::{Bernoulli, Distribution, Uniform};

pub struct RandomIo;

impl WorkloadStrategy for RandomIo {
    fn mode(&self) -> Mode {
        Mode::RandomIo
    }

    fn prepare(&self, ctx: &WorkloadContext<'_>) -> SessionResult<String> {
        ensure_directory(ctx.tree, ctx.client_dir, &ctx.retry);
        let path = ctx.working_file(self.mode());
        seed_if_missing(ctx, &path)?;
        Ok(path)
    }

    fn run(&self, ctx: &WorkloadContext<'_>, path: &str) -> SessionResult<WorkloadOutcome> {
        let handle = with_retry(&ctx.retry, "open for random io", || {
            ctx.tree.open(path, AccessIntent::ReadWrite, CreateDisposition::OpenExisting)
        })?;

        let block_size = ctx.block_size();
        let max_offset = ctx.workload.max_file_size.saturating_sub(ctx.workload.block_size);
        let offsets = Uniform::new_inclusive(0, max_offset);
        let reads = Bernoulli::from_ratio(u32::from(ctx.workload.read_percent.min(100)), 100)
            .map_err(|e| SessionError::Permanent(e.to_string()))?;

        let mut rng = rand::thread_rng();
        let mut payload = PayloadGenerator::new();
        let mut buf = payload.block(block_size, FillPattern::Random);

        let outcome = with_file(handle, |file| {
            let mut outcome = WorkloadOutcome::default();
            for _ in 0..ctx.workload.random_ops {
                let offset = offsets.sample(&mut rng);
                if reads.sample(&mut rng) {
                    match file.read_at(offset, block_size) {
                        Ok(data) => outcome.bytes_read += data.len() as u64,
                        Err(e) if e.is_end_of_file() => {}
                        Err(e) => {
                            tracing::debug!("Task {}: read at {} skipped: {}", ctx.task_index, offset, e);
                            outcome.skipped_reads += 1;
                        }
                    }
                } else {
                    payload.refill(&mut buf);
                    let n = with_retry(&ctx.retry, "random write", || file.write_at(offset, &buf))?;
                    outcome.bytes_written += n as u64;
                }
            }
            Ok(outcome)
        })?;

        if outcome.skipped_reads > 0 {
            tracing::warn!(
                "Task {}: {} of {} random reads failed and were skipped",
                ctx.task_index,
                outcome.skipped_reads,
                ctx.workload.random_ops
            );
        }
        Ok(outcome)
    }

    /// Both directions count as moved
    fn moved_bytes(&self, outcome: &WorkloadOutcome) -> u64 {
        outcome.bytes_read + outcome.bytes_written
    }
}
