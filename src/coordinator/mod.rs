//! Coordinator module
//!
//! The scheduler fans out one named thread per session task (N is both the
//! task count and the concurrency width) and fans results back in over a
//! channel in completion order. Each result is handed to a sink as soon as it
//! arrives.
//!
//! With fail-fast enabled the scheduler stops taking results at the first
//! failure and stops the clock there. Tasks already running are never
//! interrupted: every thread is still joined before `run` returns, so each
//! task finishes its teardown.

use crate::config::{Config, Mode};
use crate::session::ShareConnector;
use crate::stats::aggregator::Aggregator;
use crate::stats::{local_hostname, Summary};
use crate::task::{SessionTask, TaskPhase, TaskResult};
use crossbeam::channel;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Summary of how a run went from the scheduler's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Tasks dispatched
    pub dispatched: usize,
    /// Results handed to the sink
    pub received: usize,
    /// Scheduler start to last accepted result
    pub elapsed: Duration,
    /// Fail-fast stopped the run before every result arrived
    pub stopped_early: bool,
}

/// Bounded fan-out / fan-in executor for session tasks
pub struct Scheduler {
    num_tasks: usize,
    mode: Mode,
    fail_fast: bool,
}

impl Scheduler {
    pub fn new(num_tasks: usize, mode: Mode, fail_fast: bool) -> Self {
        Self {
            num_tasks,
            mode,
            fail_fast,
        }
    }

    /// Run `factory(index)` for every task index and feed results to `sink`
    ///
    /// A task that panics, or whose thread cannot be spawned, yields a failed
    /// result, so without fail-fast the sink sees exactly N results.
    pub fn run<F, S>(&self, factory: F, mut sink: S) -> RunOutcome
    where
        F: Fn(usize) -> TaskResult + Sync,
        S: FnMut(TaskResult),
    {
        let start = Instant::now();
        let (tx, rx) = channel::unbounded::<TaskResult>();
        let factory = &factory;
        let mode = self.mode;

        thread::scope(|scope| {
            for index in 0..self.num_tasks {
                let task_tx = tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("task-{}", index))
                    .spawn_scoped(scope, move || {
                        let task_start = Instant::now();
                        let result = panic::catch_unwind(AssertUnwindSafe(|| factory(index)))
                            .unwrap_or_else(|payload| {
                                let message = format!("task panicked: {}", panic_message(payload.as_ref()));
                                tracing::error!("Task {}: {}", index, message);
                                TaskResult::failed(index, mode, TaskPhase::Execute, message, task_start.elapsed())
                            });
                        // The receiver may be gone after fail-fast
                        let _ = task_tx.send(result);
                    });

                if let Err(e) = spawned {
                    tracing::error!("Failed to spawn thread for task {}: {}", index, e);
                    let _ = tx.send(spawn_failed(index, mode, &e));
                }
            }
            drop(tx);

            let mut received = 0;
            let mut elapsed = Duration::ZERO;
            let mut stopped_early = false;

            for result in rx.iter() {
                let failed = !result.is_success();
                received += 1;
                elapsed = start.elapsed();
                sink(result);

                if failed && self.fail_fast {
                    stopped_early = received < self.num_tasks;
                    if stopped_early {
                        tracing::warn!(
                            "Fail-fast: stopping after first failure ({} of {} results received)",
                            received,
                            self.num_tasks
                        );
                    }
                    break;
                }
            }
            drop(rx);

            if stopped_early {
                tracing::info!("Waiting for in-flight tasks to release their sessions");
            }

            RunOutcome {
                dispatched: self.num_tasks,
                received,
                elapsed,
                stopped_early,
            }
        })
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: Summary,
    /// Results in arrival order
    pub results: Vec<TaskResult>,
}

/// Run every session task of `config` against `connector`
///
/// `on_result` sees each result as it arrives, before it is folded.
///
/// With fail-fast the summary's clock stops at the first failure, but this
/// call only returns once every in-flight task has finished and released its
/// session. A remote call that never returns therefore holds back the
/// summary too.
pub fn run_load(
    config: &Arc<Config>,
    connector: Arc<dyn ShareConnector>,
    mut on_result: impl FnMut(&TaskResult),
) -> RunReport {
    let workload = &config.workload;
    let scheduler = Scheduler::new(workload.num_tasks, workload.mode, config.runtime.fail_fast);
    let mut aggregator = Aggregator::new(workload.num_tasks).with_hostname(local_hostname());
    let mut results = Vec::with_capacity(workload.num_tasks);

    tracing::info!(
        "Dispatching {} {} tasks via {} backend",
        workload.num_tasks,
        workload.mode,
        connector.name()
    );
    let outcome = scheduler.run(
        |index| SessionTask::new(index, Arc::clone(&connector), Arc::clone(config)).run(),
        |result| {
            on_result(&result);
            aggregator.add(&result);
            results.push(result);
        },
    );

    aggregator.set_stopped_early(outcome.stopped_early);
    let summary = aggregator.finish(outcome.elapsed);
    tracing::info!(
        "Run finished: {}/{} tasks completed, {} bytes moved in {:.2?}",
        summary.tasks_completed,
        summary.tasks_attempted,
        summary.bytes_moved,
        summary.elapsed
    );
    RunReport { summary, results }
}

/// Result standing in for a task whose thread never started
fn spawn_failed(index: usize, mode: Mode, error: &std::io::Error) -> TaskResult {
    TaskResult::failed(
        index,
        mode,
        TaskPhase::Connect,
        format!("failed to spawn task thread: {}", error),
        Duration::ZERO,
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
