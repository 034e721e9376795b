//! Tempest - concurrent session and IO load generator for network file shares
//!
//! Tempest opens many independent client sessions against one share and
//! drives an IO access pattern through each of them, to see how the server
//! holds up under session and request pressure.
//!
//! # Architecture
//!
//! - **Sessions**: a remote-file capability (connect, attach, open, positioned
//!   read/write, flush, close) behind traits, with a mounted-share and an
//!   in-memory backend
//! - **Workloads**: streaming write, streaming read, read IOPS, random IO and
//!   create/delete churn, each retrying its remote operations explicitly
//! - **Tasks**: one session lifecycle per task with guaranteed teardown
//! - **Coordinator**: one thread per task, results fanned in over a channel,
//!   optional fail-fast
//! - **Stats**: order-independent aggregation into a run summary

pub mod config;
pub mod coordinator;
pub mod output;
pub mod session;
pub mod stats;
pub mod task;
pub mod util;
pub mod workload;

// Re-export commonly used types
pub use config::{Config, Mode};
pub use coordinator::{run_load, RunReport, Scheduler};
pub use stats::Summary;
pub use task::{SessionTask, TaskResult};

/// Result type used throughout Tempest
pub type Result<T> = anyhow::Result<T>;
