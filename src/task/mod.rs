//! Session task
//!
//! A session task owns one remote session for its whole life and walks it
//! through a fixed sequence of states:
//!
//! ```text
//! Connecting -> Attaching -> Preparing -> Executing -> Closing -> Done
//! ```
//!
//! A connect failure goes straight to `Done`. Any later failure still passes
//! through `Closing`, and the session lease releases the tree and the session
//! on every exit path, unwinding included. Each task produces exactly one
//! [`TaskResult`]. A failed task reports only its error and the phase it
//! failed in; counters of partially completed work are discarded.

use crate::config::{Config, Mode};
use crate::session::{SessionError, ShareConnector, ShareSession, ShareTree};
use crate::util::retry::{with_retry, RetryPolicy};
use crate::workload::{strategy_for, WorkloadContext, WorkloadOutcome, WorkloadStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle state of a session task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Connecting,
    Attaching,
    Preparing,
    Executing,
    Closing,
    Done,
}

/// Phase in which a task failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskPhase {
    Connect,
    Attach,
    Prepare,
    Execute,
}

impl TaskPhase {
    /// Whether the failure happened before a session was usable
    pub fn is_session_setup(&self) -> bool {
        matches!(self, TaskPhase::Connect | TaskPhase::Attach)
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPhase::Connect => write!(f, "connect"),
            TaskPhase::Attach => write!(f, "attach"),
            TaskPhase::Prepare => write!(f, "prepare"),
            TaskPhase::Execute => write!(f, "execute"),
        }
    }
}

/// Failure of a task: what went wrong and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub phase: TaskPhase,
    pub message: String,
}

/// Outcome of one session task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub task_index: usize,
    pub mode: Mode,
    /// Bytes counted as moved by the task's mode
    pub bytes_transferred: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub files_created: u64,
    pub skipped_reads: u64,
    /// Wall time from dispatch to teardown
    pub duration: Duration,
    pub failure: Option<TaskFailure>,
}

impl TaskResult {
    /// Result of a task that completed its workload
    pub fn completed(task_index: usize, mode: Mode, moved: u64, outcome: WorkloadOutcome, duration: Duration) -> Self {
        Self {
            task_index,
            mode,
            bytes_transferred: moved,
            bytes_read: outcome.bytes_read,
            bytes_written: outcome.bytes_written,
            files_created: outcome.files_created,
            skipped_reads: outcome.skipped_reads,
            duration,
            failure: None,
        }
    }

    /// Result of a failed task: error and phase only, no counters
    pub fn failed(task_index: usize, mode: Mode, phase: TaskPhase, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            task_index,
            mode,
            bytes_transferred: 0,
            bytes_read: 0,
            bytes_written: 0,
            files_created: 0,
            skipped_reads: 0,
            duration,
            failure: Some(TaskFailure {
                phase,
                message: message.into(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn error(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.message.as_str())
    }
}

/// Releases the tree and the session when dropped
struct SessionLease {
    task_index: usize,
    session: Box<dyn ShareSession>,
    tree: Option<Arc<dyn ShareTree>>,
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if let Some(tree) = self.tree.take() {
            if let Err(e) = tree.disconnect() {
                tracing::warn!("Task {}: tree disconnect failed: {}", self.task_index, e);
            }
        }
        if let Err(e) = self.session.disconnect() {
            tracing::warn!("Task {}: session disconnect failed: {}", self.task_index, e);
        }
    }
}

/// One end-to-end session lifecycle against the share
pub struct SessionTask {
    index: usize,
    connector: Arc<dyn ShareConnector>,
    config: Arc<Config>,
    strategy: Box<dyn WorkloadStrategy>,
    retry: RetryPolicy,
    verify: RetryPolicy,
    state: TaskState,
}

impl SessionTask {
    pub fn new(index: usize, connector: Arc<dyn ShareConnector>, config: Arc<Config>) -> Self {
        let strategy = strategy_for(config.workload.mode);
        let retry = config.runtime.retry.policy();
        Self {
            index,
            connector,
            config,
            strategy,
            retry,
            verify: RetryPolicy::size_verification(),
            state: TaskState::Connecting,
        }
    }

    /// Override the written-size verification policy
    pub fn with_verify_policy(mut self, verify: RetryPolicy) -> Self {
        self.verify = verify;
        self
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Run the task to completion
    pub fn run(mut self) -> TaskResult {
        let start = Instant::now();
        tracing::info!("Task {}: starting ({})", self.index, self.strategy.mode());

        let outcome = self.connect_and_drive();
        self.transition(TaskState::Done);

        let result = match outcome {
            Ok(outcome) => TaskResult::completed(
                self.index,
                self.strategy.mode(),
                self.strategy.moved_bytes(&outcome),
                outcome,
                start.elapsed(),
            ),
            Err((phase, e)) => {
                tracing::error!("Task {}: failed during {}: {}", self.index, phase, e);
                TaskResult::failed(self.index, self.strategy.mode(), phase, e.to_string(), start.elapsed())
            }
        };

        if result.is_success() {
            tracing::info!(
                "Task {}: done in {:.2?} ({} bytes moved, {} written, {} files)",
                self.index,
                result.duration,
                result.bytes_transferred,
                result.bytes_written,
                result.files_created
            );
        }
        result
    }

    fn connect_and_drive(&mut self) -> Result<WorkloadOutcome, (TaskPhase, SessionError)> {
        let config = Arc::clone(&self.config);
        let share = &config.share;

        self.transition(TaskState::Connecting);
        let session = with_retry(&self.retry, "connect", || {
            self.connector.connect(&share.server, &share.credentials)
        })
        .map_err(|e| (TaskPhase::Connect, e))?;

        let mut lease = SessionLease {
            task_index: self.index,
            session,
            tree: None,
        };

        self.transition(TaskState::Attaching);
        let attached = with_retry(&self.retry, "attach", || lease.session.attach(&share.share));

        let outcome = match attached {
            Ok(tree) => {
                let tree = lease.tree.insert(tree).clone();
                self.drive(tree.as_ref())
            }
            Err(e) => Err((TaskPhase::Attach, e)),
        };

        self.transition(TaskState::Closing);
        drop(lease);
        outcome
    }

    fn drive(&mut self, tree: &dyn ShareTree) -> Result<WorkloadOutcome, (TaskPhase, SessionError)> {
        let config = Arc::clone(&self.config);
        let ctx = WorkloadContext {
            tree,
            workload: &config.workload,
            retry: self.retry,
            verify: self.verify,
            client_dir: &config.runtime.client_id,
            task_index: self.index,
        };

        self.transition(TaskState::Preparing);
        let path = self
            .strategy
            .prepare(&ctx)
            .map_err(|e| (TaskPhase::Prepare, e))?;

        self.transition(TaskState::Executing);
        self.strategy.run(&ctx, &path).map_err(|e| (TaskPhase::Execute, e))
    }

    fn transition(&mut self, next: TaskState) {
        tracing::debug!("Task {}: {:?} -> {:?}", self.index, self.state, next);
        self.state = next;
    }
}
