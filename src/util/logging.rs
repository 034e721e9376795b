//! Logging setup
//!
//! Installs a global `tracing` subscriber that writes every record at the
//! configured level to a timestamped file under the log directory, and mirrors
//! warnings and errors to stderr so the console stays readable while hundreds
//! of sessions run.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::FmtSubscriber;

/// Name of the log file for a run started at `timestamp`
pub fn log_file_name(timestamp: chrono::DateTime<chrono::Local>) -> String {
    format!("tempest_{}.log", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Initialize logging and return the log file path
///
/// Must be called at most once per process.
pub fn init_logging(log_dir: &Path, debug: bool) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let log_path = log_dir.join(log_file_name(chrono::Local::now()));
    let file = File::create(&log_path)
        .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

    let level = if debug { Level::DEBUG } else { Level::INFO };
    let writer = Mutex::new(file).and(std::io::stderr.with_max_level(Level::WARN));

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_names(true)
        .with_ansi(false)
        .with_writer(writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    tracing::info!("Logging initialized. Log file: {}", log_path.display());
    Ok(log_path)
}
