//! Default workload: data IO plus metadata churn
//!
//! One large task-specific file is written and read back, then a random
//! number of 4 KiB placeholder files is created in the client directory and
//! every one of them is deleted again. Deletion is best effort: a file that
//! cannot be removed is logged and left behind without failing the task.

use super::streaming_read::read_file;
use super::streaming_write::write_file;
use super::{ensure_directory, WorkloadContext, WorkloadOutcome, WorkloadStrategy};
use crate::config::Mode;
use crate::session::{join_path, with_file, AccessIntent, CreateDisposition, SessionResult};
use crate::util::buffer::{FillPattern, PayloadGenerator, PLACEHOLDER_SIZE};
use crate::util::retry::with_retry;
use rand::Rng;

pub struct Churn;

impl WorkloadStrategy for Churn {
    fn mode(&self) -> Mode {
        Mode::Default
    }

    fn prepare(&self, ctx: &WorkloadContext<'_>) -> SessionResult<String> {
        ensure_directory(ctx.tree, ctx.client_dir, &ctx.retry);
        Ok(ctx.working_file(self.mode()))
    }

    fn run(&self, ctx: &WorkloadContext<'_>, path: &str) -> SessionResult<WorkloadOutcome> {
        let mut outcome = WorkloadOutcome {
            bytes_written: write_file(ctx, path, ctx.workload.max_file_size)?,
            ..Default::default()
        };
        outcome.bytes_read = read_file(ctx, path)?;

        let count = churn_count(ctx.workload.churn_min, ctx.workload.churn_max, &mut rand::thread_rng());
        outcome.files_created = create_and_delete(ctx, count)? as u64;
        Ok(outcome)
    }
}

/// Number of placeholder files, uniform in `[min, max)`
///
/// An empty range yields `min`.
pub fn churn_count<R: Rng>(min: usize, max: usize, rng: &mut R) -> usize {
    if max <= min {
        min
    } else {
        rng.gen_range(min..max)
    }
}

/// Path of the `seq`-th placeholder file of a task
fn placeholder_path(ctx: &WorkloadContext<'_>, seq: usize) -> String {
    join_path(ctx.client_dir, &format!("{}_churn.{}", seq, ctx.task_index))
}

/// Create `count` placeholder files, then delete them all
///
/// Returns the number created. If a creation fails, the files created so far
/// are still deleted before the error is returned.
fn create_and_delete(ctx: &WorkloadContext<'_>, count: usize) -> SessionResult<usize> {
    let zeros = PayloadGenerator::new().block(PLACEHOLDER_SIZE, FillPattern::Zeros);
    let mut created = Vec::with_capacity(count);
    let mut failure = None;

    for seq in 0..count {
        let path = placeholder_path(ctx, seq);
        match create_placeholder(ctx, &path, &zeros) {
            Ok(()) => created.push(path),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let mut leaked = 0;
    for path in &created {
        if let Err(e) = delete_file(ctx, path) {
            tracing::warn!("Task {}: failed to delete {}: {}", ctx.task_index, path, e);
            leaked += 1;
        }
    }
    tracing::debug!(
        "Task {}: churned {} files ({} left behind)",
        ctx.task_index,
        created.len(),
        leaked
    );

    match failure {
        Some(e) => Err(e),
        None => Ok(created.len()),
    }
}

fn create_placeholder(ctx: &WorkloadContext<'_>, path: &str, data: &[u8]) -> SessionResult<()> {
    let handle = with_retry(&ctx.retry, "create placeholder", || {
        ctx.tree.open(path, AccessIntent::Write, CreateDisposition::CreateOrOverwrite)
    })?;
    with_file(handle, |file| {
        with_retry(&ctx.retry, "write placeholder", || file.write_at(0, data)).map(|_| ())
    })
}

/// Delete through a delete-on-close open
fn delete_file(ctx: &WorkloadContext<'_>, path: &str) -> SessionResult<()> {
    with_retry(&ctx.retry, "delete", || {
        ctx.tree
            .open(path, AccessIntent::Delete, CreateDisposition::OpenExisting)?
            .close()
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::session::mock::{MockConnector, MockOpKind};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_churn_count_bounds() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..1000 {
            let n = churn_count(10, 10_000, &mut rng);
            assert!((10..10_000).contains(&n));
        }
        assert_eq!(churn_count(5, 5, &mut rng), 5);
    }

    #[test]
    fn test_full_cycle() {
        let connector = MockConnector::new();
        let tree = attach(&connector);
        let workload = small_workload(Mode::Default);
        let ctx = context(tree.as_ref(), &workload);

        let path = Churn.prepare(&ctx).unwrap();
        let outcome = Churn.run(&ctx, &path).unwrap();

        assert_eq!(outcome.bytes_written, workload.max_file_size);
        assert_eq!(outcome.bytes_read, workload.max_file_size);
        assert_eq!(Churn.moved_bytes(&outcome), workload.max_file_size);
        assert!((3..6).contains(&outcome.files_created));

        // Only the large file survives
        assert_eq!(connector.file_count(), 1);
        assert_eq!(connector.count_ops(MockOpKind::Delete), outcome.files_created as usize);
        assert_eq!(connector.open_handles(), 0);
    }

    #[test]
    fn test_delete_failures_do_not_fail_task() {
        let connector = MockConnector::new();
        connector.set_fail_deletes(true);
        let tree = attach(&connector);
        let workload = small_workload(Mode::Default);
        let ctx = context(tree.as_ref(), &workload);

        let path = Churn.prepare(&ctx).unwrap();
        let outcome = Churn.run(&ctx, &path).unwrap();

        assert!(outcome.files_created >= 3);
        assert_eq!(connector.file_count(), 1 + outcome.files_created as usize);
        assert_eq!(connector.open_handles(), 0);
    }

    #[test]
    fn test_directory_failure_still_runs() {
        let connector = MockConnector::new();
        connector.set_fail_directory_create(true);
        let tree = attach(&connector);
        let workload = small_workload(Mode::Default);
        let ctx = context(tree.as_ref(), &workload);

        // The mock has no real directories, so file opens still succeed
        let path = Churn.prepare(&ctx).unwrap();
        assert!(Churn.run(&ctx, &path).is_ok());
    }
}
