//! CLI argument parsing using clap
//!
//! Every option that can also come from the TOML file is an `Option` so the
//! merge step can tell "explicitly set" apart from "left at default".

use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;

/// Session backend selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Share mounted on the local filesystem (<server>/<share>)
    Local,
    /// In-memory share (engine smoke tests)
    Mock,
}

/// Tempest - concurrent session and IO load generator for file shares
#[derive(Parser, Debug, Default)]
#[command(name = "tempest")]
#[command(version, about, long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .args(["streaming_reads", "read_iops", "streaming_writes", "random_io"])
        .multiple(false)
))]
pub struct Cli {
    /// TOML configuration file (command-line values take precedence)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    // === Target ===
    /// Server address (local backend: mount root directory)
    #[arg(long)]
    pub server: Option<String>,

    /// Share name
    #[arg(long)]
    pub share: Option<String>,

    /// Username for the share
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Password for the share
    #[arg(short = 'p', long, env = "TEMPEST_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Session backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    // === Workload ===
    /// Number of concurrent session tasks
    #[arg(short = 'n', long)]
    pub num_tasks: Option<usize>,

    /// Block size for IO operations (e.g., 4k, 64k, 1M)
    #[arg(short = 'b', long)]
    pub block_size: Option<String>,

    /// Working file size per task (bare numbers are MiB; e.g., 512, 10M, 2G)
    #[arg(short = 's', long)]
    pub max_file_size: Option<String>,

    /// Concurrent block-range reads of each task's file
    #[arg(long)]
    pub streaming_reads: bool,

    /// High-rate 4 KiB reads at offset 0
    #[arg(long)]
    pub read_iops: bool,

    /// Sequential block writes up to the file size
    #[arg(long)]
    pub streaming_writes: bool,

    /// Mixed reads and writes at random offsets
    #[arg(long)]
    pub random_io: bool,

    /// Reads per task in read-iops mode
    #[arg(long)]
    pub iops_reads: Option<u64>,

    /// Operations per task in random-io mode
    #[arg(long)]
    pub random_ops: Option<u64>,

    /// Read percentage for random-io mode (0-100)
    #[arg(long)]
    pub read_percent: Option<u8>,

    /// Concurrent range readers per streaming read
    #[arg(long)]
    pub read_workers: Option<usize>,

    // === Runtime ===
    /// Stop awaiting results after the first failed task
    #[arg(long)]
    pub fail_fast: bool,

    /// Attempts per remote operation (including the first)
    #[arg(long)]
    pub retry_attempts: Option<u32>,

    /// Delay between attempts (e.g., 500ms, 2s)
    #[arg(long)]
    pub retry_delay: Option<String>,

    /// File holding the persisted client UUID
    #[arg(long)]
    pub client_id_file: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug-level logging
    #[arg(long)]
    pub debug: bool,

    // === Output ===
    /// Write the run summary (and per-task results) as JSON
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Print every task result
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Directory for log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments that do not depend on the config file
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(pct) = self.read_percent {
            if pct > 100 {
                anyhow::bail!("read_percent must be between 0 and 100");
            }
        }

        if self.read_percent.is_some() && !self.random_io {
            if self.streaming_reads || self.read_iops || self.streaming_writes {
                anyhow::bail!("--read-percent only applies to --random-io");
            }
        }

        if let Some(0) = self.retry_attempts {
            anyhow::bail!("retry_attempts must be at least 1");
        }

        if let Some(0) = self.read_workers {
            anyhow::bail!("read_workers must be at least 1");
        }

        Ok(())
    }
}
