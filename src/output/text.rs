//! Human-readable text output

use crate::stats::Summary;
use crate::task::TaskResult;
use crate::util::time::{format_bytes, format_duration, format_number, format_rate, format_throughput};
use std::fmt::Write;

/// Print the run summary to stdout
pub fn print_summary(summary: &Summary) {
    print!("{}", render_summary(summary));
}

/// Render the run summary
///
/// A run that moved no data ends with an explicit warning block instead of
/// presenting zero throughput as a result.
pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_summary(&mut out, summary);
    out
}

fn write_summary(out: &mut String, summary: &Summary) -> std::fmt::Result {
    writeln!(out, "═══════════════════════════════════════════════════════════")?;
    writeln!(out, "                    RUN SUMMARY ({})", summary.hostname)?;
    writeln!(out, "═══════════════════════════════════════════════════════════")?;
    writeln!(out)?;

    writeln!(out, "Elapsed Time: {}", format_duration(summary.elapsed))?;
    let modes: Vec<_> = summary.modes.iter().map(|m| m.label()).collect();
    writeln!(out, "Modes:        {}", if modes.is_empty() { "-".to_string() } else { modes.join(", ") })?;
    writeln!(out)?;

    writeln!(out, "Tasks:")?;
    writeln!(
        out,
        "  Completed: {} / {} attempted",
        format_number(summary.tasks_completed as u64),
        format_number(summary.tasks_attempted as u64)
    )?;
    if summary.tasks_failed > 0 {
        writeln!(out, "  Failed:    {}", format_number(summary.tasks_failed as u64))?;
    }
    if summary.stopped_early {
        writeln!(out, "  Stopped early (fail-fast)")?;
    }
    writeln!(out)?;

    writeln!(out, "Sessions:")?;
    writeln!(out, "  Established: {}", format_number(summary.sessions_established as u64))?;
    writeln!(out, "  Failed:      {}", format_number(summary.sessions_failed as u64))?;
    let lifetimes = &summary.session_lifetimes;
    if let (Some(p50), Some(p90), Some(p99), Some(max)) = (lifetimes.p50, lifetimes.p90, lifetimes.p99, lifetimes.max) {
        writeln!(
            out,
            "  Lifetime:    p50 {}  p90 {}  p99 {}  max {}",
            format_duration(p50),
            format_duration(p90),
            format_duration(p99),
            format_duration(max)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "Data:")?;
    writeln!(out, "  Moved:   {}", format_bytes(summary.bytes_moved))?;
    writeln!(out, "  Written: {}", format_bytes(summary.bytes_written))?;
    writeln!(out, "  Files churned: {}", format_number(summary.files_churned))?;
    if summary.skipped_reads > 0 {
        writeln!(out, "  Skipped reads: {}", format_number(summary.skipped_reads))?;
    }
    writeln!(out)?;

    writeln!(out, "Throughput:")?;
    writeln!(out, "  Moved: {}", format_throughput(summary.throughput))?;
    writeln!(out, "  Write: {}", format_throughput(summary.write_throughput))?;
    writeln!(out, "  IOPS:  {}", format_rate(summary.iops))?;

    if summary.per_mode.len() > 1 {
        writeln!(out)?;
        writeln!(out, "Per Mode:")?;
        for (mode, totals) in &summary.per_mode {
            writeln!(
                out,
                "  {:<17} {}/{} tasks, {} moved, {} written, {} files",
                mode.label(),
                totals.completed,
                totals.tasks,
                format_bytes(totals.bytes_moved),
                format_bytes(totals.bytes_written),
                format_number(totals.files_churned)
            )?;
        }
    }

    if summary.no_data_moved {
        writeln!(out)?;
        writeln!(out, "WARNING: no data moved.")?;
        if summary.bytes_written > 0 {
            writeln!(
                out,
                "  {} written; written bytes are not counted as moved.",
                format_bytes(summary.bytes_written)
            )?;
        } else {
            writeln!(
                out,
                "  {} of {} tasks completed; check the server address, share name and credentials.",
                summary.tasks_completed, summary.tasks_attempted
            )?;
        }
    }

    writeln!(out, "═══════════════════════════════════════════════════════════")?;
    Ok(())
}

/// One line per task for verbose runs
pub fn format_task_result(result: &TaskResult) -> String {
    match &result.failure {
        None => format!(
            "[task {:>4}] {} ok in {}: {} moved, {} written, {} files",
            result.task_index,
            result.mode,
            format_duration(result.duration),
            format_bytes(result.bytes_transferred),
            format_bytes(result.bytes_written),
            result.files_created
        ),
        Some(failure) => format!(
            "[task {:>4}] {} FAILED during {} after {}: {}",
            result.task_index,
            result.mode,
            failure.phase,
            format_duration(result.duration),
            failure.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::stats::aggregator::Aggregator;
    use crate::task::TaskPhase;
    use crate::workload::WorkloadOutcome;
    use std::time::Duration;

    #[test]
    fn test_no_data_warning() {
        let mut aggregator = Aggregator::new(1).with_hostname("loadgen-1");
        aggregator.add(&TaskResult::failed(0, Mode::Default, TaskPhase::Connect, "refused", Duration::ZERO));
        let text = render_summary(&aggregator.finish(Duration::from_secs(1)));

        assert!(text.contains("loadgen-1"));
        assert!(text.contains("WARNING: no data moved"));
        assert!(text.contains("0 / 1 attempted"));
    }

    #[test]
    fn test_write_only_warning_names_written_bytes() {
        let mut aggregator = Aggregator::new(1);
        let outcome = WorkloadOutcome {
            bytes_written: 1 << 20,
            ..Default::default()
        };
        aggregator.add(&TaskResult::completed(0, Mode::StreamingWrites, 0, outcome, Duration::from_secs(1)));
        let text = render_summary(&aggregator.finish(Duration::from_secs(1)));

        assert!(text.contains("WARNING: no data moved"));
        assert!(text.contains("not counted as moved"));
        assert!(!text.contains("check the server address"));
    }

    #[test]
    fn test_healthy_run_has_no_warning() {
        let mut aggregator = Aggregator::new(1);
        let outcome = WorkloadOutcome {
            bytes_read: 1 << 20,
            ..Default::default()
        };
        aggregator.add(&TaskResult::completed(0, Mode::StreamingReads, 1 << 20, outcome, Duration::from_secs(1)));
        let text = render_summary(&aggregator.finish(Duration::from_secs(1)));

        assert!(!text.contains("WARNING"));
        assert!(text.contains("streaming-reads"));
        assert!(text.contains("1.00 MB/s"));
    }

    #[test]
    fn test_format_task_result() {
        let failed = TaskResult::failed(7, Mode::RandomIo, TaskPhase::Attach, "access denied", Duration::ZERO);
        let line = format_task_result(&failed);
        assert!(line.contains("task    7"));
        assert!(line.contains("FAILED during attach"));
        assert!(line.contains("access denied"));
    }
}
