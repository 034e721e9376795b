//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation. The
//! result of resolution is a single [`Config`] that the engine consumes as-is.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::session::Credentials;
use crate::util::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Complete resolved run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub share: ShareConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Target share and how to reach it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Server address (for the local backend: the mount root directory)
    #[serde(default)]
    pub server: String,
    /// Share name
    #[serde(default)]
    pub share: String,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub backend: BackendType,
}

/// Session backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BackendType {
    /// Share mounted on the local filesystem
    #[default]
    Local,
    /// In-memory share
    Mock,
}

/// Access pattern run by every session task
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Concurrent block-range reads of one file
    StreamingReads,
    /// High-rate 4 KiB reads at offset 0
    ReadIops,
    /// Sequential block writes up to the file size
    StreamingWrites,
    /// Mixed reads and writes at uniformly random offsets
    RandomIo,
    /// Write, read back, then create/delete churn
    #[default]
    Default,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::StreamingReads,
        Mode::ReadIops,
        Mode::StreamingWrites,
        Mode::RandomIo,
        Mode::Default,
    ];

    /// Stable label used in results and reports
    pub fn label(&self) -> &'static str {
        match self {
            Mode::StreamingReads => "streaming-reads",
            Mode::ReadIops => "read-iops",
            Mode::StreamingWrites => "streaming-writes",
            Mode::RandomIo => "random-io",
            Mode::Default => "default",
        }
    }

    /// Prefix of the per-task working file name
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Mode::StreamingReads => "tempest_stream_read",
            Mode::ReadIops => "tempest_read_iops",
            Mode::StreamingWrites => "tempest_stream_write",
            Mode::RandomIo => "tempest_random_io",
            Mode::Default => "tempest",
        }
    }
}

/// Workload parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Number of session tasks (also the concurrency width)
    #[serde(default = "default_num_tasks")]
    pub num_tasks: usize,
    /// Block size in bytes
    #[serde(default = "default_block_size")]
    pub block_size: u64,
    /// Size of each task's working file in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default)]
    pub mode: Mode,
    /// Reads issued per task in read-iops mode
    #[serde(default = "default_iops_reads")]
    pub iops_reads: u64,
    /// Operations issued per task in random-io mode
    #[serde(default = "default_random_ops")]
    pub random_ops: u64,
    /// Share of random-io operations that are reads (0-100)
    #[serde(default = "default_read_percent")]
    pub read_percent: u8,
    /// Concurrent range readers per streaming read
    #[serde(default = "default_read_workers")]
    pub read_workers: usize,
    /// Lower bound (inclusive) of churn files per task
    #[serde(default = "default_churn_min")]
    pub churn_min: usize,
    /// Upper bound (exclusive) of churn files per task
    #[serde(default = "default_churn_max")]
    pub churn_max: usize,
}

fn default_num_tasks() -> usize {
    1
}

fn default_block_size() -> u64 {
    1024 * 1024
}

fn default_max_file_size() -> u64 {
    1024 * 1024 * 1024
}

fn default_iops_reads() -> u64 {
    1000
}

fn default_random_ops() -> u64 {
    1000
}

fn default_read_percent() -> u8 {
    50
}

fn default_read_workers() -> usize {
    8
}

fn default_churn_min() -> usize {
    10
}

fn default_churn_max() -> usize {
    10_000
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            num_tasks: default_num_tasks(),
            block_size: default_block_size(),
            max_file_size: default_max_file_size(),
            mode: Mode::default(),
            iops_reads: default_iops_reads(),
            random_ops: default_random_ops(),
            read_percent: default_read_percent(),
            read_workers: default_read_workers(),
            churn_min: default_churn_min(),
            churn_max: default_churn_max(),
        }
    }
}

/// Retry settings applied to every remote operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

/// Runtime behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Stop awaiting results after the first task failure
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default)]
    pub retry: RetryConfig,
    /// File holding the persisted client UUID
    #[serde(default = "default_client_id_file")]
    pub client_id_file: PathBuf,
    /// Resolved client identity (filled in from `client_id_file` when empty)
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub debug: bool,
}

fn default_client_id_file() -> PathBuf {
    PathBuf::from(crate::util::identity::DEFAULT_CLIENT_ID_FILE)
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            retry: RetryConfig::default(),
            client_id_file: default_client_id_file(),
            client_id: String::new(),
            dry_run: false,
            debug: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON summary output path
    pub json_output: Option<PathBuf>,
    /// Report every task result, not just the summary
    #[serde(default)]
    pub verbose: bool,
    /// Directory for run log files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_output: None,
            verbose: false,
            log_dir: default_log_dir(),
        }
    }
}

// Display trait implementations

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Share: {}", self.share)?;
        writeln!(f, "  Workload: {}", self.workload)?;
        writeln!(f, "  Runtime: {}", self.runtime)?;
        Ok(())
    }
}

impl fmt::Display for ShareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} as '{}' via {}",
            self.server, self.share, self.credentials.username, self.backend
        )
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendType::Local => write!(f, "local"),
            BackendType::Mock => write!(f, "mock"),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for WorkloadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode={}, tasks={}, block_size={}, file_size={}",
            self.mode, self.num_tasks, self.block_size, self.max_file_size
        )?;
        match self.mode {
            Mode::ReadIops => write!(f, ", iops_reads={}", self.iops_reads)?,
            Mode::RandomIo => write!(
                f,
                ", random_ops={}, read_percent={}",
                self.random_ops, self.read_percent
            )?,
            Mode::StreamingReads => write!(f, ", read_workers={}", self.read_workers)?,
            Mode::Default => write!(
                f,
                ", read_workers={}, churn=[{}, {})",
                self.read_workers, self.churn_min, self.churn_max
            )?,
            Mode::StreamingWrites => {}
        }
        Ok(())
    }
}

impl fmt::Display for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "client_id={}, fail_fast={}, retry={}x{}ms",
            self.client_id, self.fail_fast, self.retry.max_attempts, self.retry.delay_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_labels_unique() {
        let labels: std::collections::HashSet<_> = Mode::ALL.iter().map(|m| m.label()).collect();
        assert_eq!(labels.len(), Mode::ALL.len());
    }

    #[test]
    fn test_default_mode_is_churn() {
        assert_eq!(WorkloadConfig::default().mode, Mode::Default);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let retry = RetryConfig {
            max_attempts: 3,
            delay_ms: 250,
        };
        let policy = retry.policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_millis(250));
    }

    #[test]
    fn test_workload_display_mentions_mode_parameters() {
        let workload = WorkloadConfig {
            mode: Mode::RandomIo,
            read_percent: 70,
            ..Default::default()
        };
        let rendered = workload.to_string();
        assert!(rendered.contains("random-io"));
        assert!(rendered.contains("read_percent=70"));
    }
}
