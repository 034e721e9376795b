//! Streaming write: sequential blocks up to the configured file size

use super::{ensure_directory, remote_file_size, WorkloadContext, WorkloadOutcome, WorkloadStrategy};
use crate::config::Mode;
use crate::session::{with_file, AccessIntent, CreateDisposition, SessionError, SessionResult};
use crate::util::buffer::{FillPattern, PayloadGenerator};
use crate::util::retry::with_retry;

/// Written files smaller than this share of the intended size are short
pub const SIZE_TOLERANCE_PERCENT: u64 = 90;

pub struct StreamingWrite;

impl WorkloadStrategy for StreamingWrite {
    fn mode(&self) -> Mode {
        Mode::StreamingWrites
    }

    fn prepare(&self, ctx: &WorkloadContext<'_>) -> SessionResult<String> {
        ensure_directory(ctx.tree, ctx.client_dir, &ctx.retry);
        Ok(ctx.working_file(self.mode()))
    }

    fn run(&self, ctx: &WorkloadContext<'_>, path: &str) -> SessionResult<WorkloadOutcome> {
        let written = write_file(ctx, path, ctx.workload.max_file_size)?;
        Ok(WorkloadOutcome {
            bytes_written: written,
            ..Default::default()
        })
    }
}

/// Create or overwrite `path` with `size` bytes of random data
///
/// Each block write is retried on its own at the current offset. The final
/// block is cut to the remaining byte count, so the file never exceeds
/// `size`. After close the size is verified under `ctx.verify`; a file that
/// stays short is rewritten from scratch under `ctx.retry`.
pub fn write_file(ctx: &WorkloadContext<'_>, path: &str, size: u64) -> SessionResult<u64> {
    let block = PayloadGenerator::new().block(ctx.block_size(), FillPattern::Random);
    let written = with_retry(&ctx.retry, "write file", || write_pass(ctx, path, size, &block))?;
    tracing::debug!("Task {}: wrote {} bytes to {}", ctx.task_index, written, path);
    Ok(written)
}

/// One open, write, flush, close and verify sequence
fn write_pass(ctx: &WorkloadContext<'_>, path: &str, size: u64, block: &[u8]) -> SessionResult<u64> {
    let handle = with_retry(&ctx.retry, "open for write", || {
        ctx.tree.open(path, AccessIntent::Write, CreateDisposition::CreateOrOverwrite)
    })?;

    let written = with_file(handle, |file| {
        let mut offset = 0u64;
        while offset < size {
            let len = (size - offset).min(block.len() as u64) as usize;
            let accepted = with_retry(&ctx.retry, "write block", || file.write_at(offset, &block[..len]))?;
            if accepted == 0 {
                return Err(SessionError::Permanent(format!(
                    "server accepted no bytes at offset {} of {}",
                    offset, path
                )));
            }
            offset += accepted as u64;
        }
        with_retry(&ctx.retry, "flush", || file.flush())?;
        Ok(offset)
    })?;

    verify_size(ctx, path, size)?;
    Ok(written)
}

/// Check that `path` holds at least the tolerated share of `expected` bytes
pub fn verify_size(ctx: &WorkloadContext<'_>, path: &str, expected: u64) -> SessionResult<u64> {
    with_retry(&ctx.verify, "verify size", || {
        let actual = remote_file_size(ctx.tree, path)?;
        if is_short(actual, expected) {
            return Err(SessionError::ShortFile { expected, actual });
        }
        Ok(actual)
    })
}

fn is_short(actual: u64, expected: u64) -> bool {
    (actual as u128) * 100 < (expected as u128) * SIZE_TOLERANCE_PERCENT as u128
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::session::mock::{MockConnector, MockOpKind};

    #[test]
    fn test_writes_full_file() {
        let connector = MockConnector::new();
        let tree = attach(&connector);
        let workload = small_workload(Mode::StreamingWrites);
        let ctx = context(tree.as_ref(), &workload);

        let path = StreamingWrite.prepare(&ctx).unwrap();
        let outcome = StreamingWrite.run(&ctx, &path).unwrap();

        assert_eq!(outcome.bytes_written, 10 * 1024);
        assert_eq!(StreamingWrite.moved_bytes(&outcome), 0);
        assert_eq!(connector.file_size(&path), Some(10 * 1024));
        assert_eq!(connector.count_ops(MockOpKind::Write), 10);
        assert_eq!(connector.count_ops(MockOpKind::Flush), 1);
        assert_eq!(connector.open_handles(), 0);
    }

    #[test]
    fn test_final_block_truncated() {
        let connector = MockConnector::new();
        let tree = attach(&connector);
        let workload = small_workload(Mode::StreamingWrites);
        let ctx = context(tree.as_ref(), &workload);

        write_file(&ctx, "odd", 2500).unwrap();

        assert_eq!(connector.file_size("odd"), Some(2500));
        let last = connector
            .operations()
            .into_iter()
            .filter(|op| op.kind == MockOpKind::Write)
            .last()
            .unwrap();
        assert_eq!(last.offset, 2048);
        assert_eq!(last.length, 452);
    }

    #[test]
    fn test_transient_write_failures_retried() {
        let connector = MockConnector::new();
        let tree = attach(&connector);
        let workload = small_workload(Mode::StreamingWrites);
        let ctx = context(tree.as_ref(), &workload);

        connector.set_transient_failures(2);
        write_file(&ctx, "flaky", 4096).unwrap();

        assert_eq!(connector.file_size("flaky"), Some(4096));
        assert_eq!(connector.count_ops(MockOpKind::Write), 6);
    }

    #[test]
    fn test_lost_writes_fail_verification() {
        let connector = MockConnector::new();
        connector.set_discard_writes(u32::MAX);
        let tree = attach(&connector);
        let workload = small_workload(Mode::StreamingWrites);
        let ctx = context(tree.as_ref(), &workload);

        let err = write_file(&ctx, "lost", 4096).unwrap_err();
        assert!(matches!(err, SessionError::ShortFile { expected: 4096, actual: 0 }));
        // Every attempt rewrote the whole file
        assert_eq!(connector.count_ops(MockOpKind::Write), 3 * 4);
        assert_eq!(connector.open_handles(), 0);
    }

    #[test]
    fn test_short_file_rewritten() {
        let connector = MockConnector::new();
        // The whole first pass is lost
        connector.set_discard_writes(4);
        let tree = attach(&connector);
        let workload = small_workload(Mode::StreamingWrites);
        let ctx = context(tree.as_ref(), &workload);

        assert_eq!(write_file(&ctx, "recovered", 4096).unwrap(), 4096);
        assert_eq!(connector.file_size("recovered"), Some(4096));
        assert_eq!(connector.count_ops(MockOpKind::Write), 8);
        assert_eq!(connector.count_ops(MockOpKind::Flush), 2);
        assert_eq!(connector.open_handles(), 0);
    }

    #[test]
    fn test_size_tolerance() {
        assert!(!is_short(90, 100));
        assert!(is_short(89, 100));
        assert!(!is_short(0, 0));
        assert!(!is_short(u64::MAX, u64::MAX));
    }
}
