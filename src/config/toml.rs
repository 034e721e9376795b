//! TOML configuration file parsing and CLI merge

use super::cli_convert::{convert_backend, mode_from_flags, parse_duration_ms, parse_size, parse_size_with_unit};
use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const MIB: u64 = 1024 * 1024;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Build the configuration for a run: file values (if any), then CLI overrides
pub fn load_config(cli: &Cli) -> Result<Config> {
    let base = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    merge_cli_with_config(cli, base)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
///
/// Only values explicitly given on the command line override the file; flags
/// can only switch behavior on.
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Share
    if let Some(ref server) = cli.server {
        config.share.server = server.clone();
    }
    if let Some(ref share) = cli.share {
        config.share.share = share.clone();
    }
    if let Some(ref username) = cli.username {
        config.share.credentials.username = username.clone();
    }
    if let Some(ref password) = cli.password {
        config.share.credentials.password = password.clone();
    }
    if let Some(backend) = cli.backend {
        config.share.backend = convert_backend(backend);
    }

    // Workload
    if let Some(num_tasks) = cli.num_tasks {
        config.workload.num_tasks = num_tasks;
    }
    if let Some(ref block_size) = cli.block_size {
        config.workload.block_size = parse_size(block_size).context("Invalid block size")?;
    }
    if let Some(ref file_size) = cli.max_file_size {
        config.workload.max_file_size =
            parse_size_with_unit(file_size, MIB).context("Invalid max file size")?;
    }
    if let Some(mode) = mode_from_flags(cli) {
        config.workload.mode = mode;
    }
    if let Some(iops_reads) = cli.iops_reads {
        config.workload.iops_reads = iops_reads;
    }
    if let Some(random_ops) = cli.random_ops {
        config.workload.random_ops = random_ops;
    }
    if let Some(read_percent) = cli.read_percent {
        config.workload.read_percent = read_percent;
    }
    if let Some(read_workers) = cli.read_workers {
        config.workload.read_workers = read_workers;
    }

    // Runtime
    if cli.fail_fast {
        config.runtime.fail_fast = true;
    }
    if let Some(attempts) = cli.retry_attempts {
        config.runtime.retry.max_attempts = attempts;
    }
    if let Some(ref delay) = cli.retry_delay {
        config.runtime.retry.delay_ms = parse_duration_ms(delay).context("Invalid retry delay")?;
    }
    if let Some(ref path) = cli.client_id_file {
        config.runtime.client_id_file = path.clone();
    }
    if cli.dry_run {
        config.runtime.dry_run = true;
    }
    if cli.debug {
        config.runtime.debug = true;
    }

    // Output
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }
    if cli.verbose {
        config.output.verbose = true;
    }
    if let Some(ref dir) = cli.log_dir {
        config.output.log_dir = dir.clone();
    }

    Ok(config)
}
