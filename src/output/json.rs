//! JSON output formatting
//!
//! Serializes the run summary, the configuration it ran with (credentials
//! excluded) and, optionally, every task result. A multi-host launcher can
//! collect one such file per instance and tell them apart by hostname.

use crate::config::Config;
use crate::stats::{ModeTotals, Summary};
use crate::task::{TaskPhase, TaskResult};
use crate::util::time::{format_bytes, format_duration, format_throughput};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            micros: d.as_micros() as u64,
            human: format_duration(d),
        }
    }
}

/// Throughput with bytes/sec and human-readable format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonThroughput {
    pub bytes_per_sec: u64,
    pub human: String,
}

impl JsonThroughput {
    pub fn new(bytes_per_sec: f64) -> Self {
        Self {
            bytes_per_sec: bytes_per_sec as u64,
            human: format_throughput(bytes_per_sec),
        }
    }
}

/// Configuration echo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRunConfig {
    pub server: String,
    pub share: String,
    pub backend: String,
    pub client_id: String,
    pub mode: String,
    pub num_tasks: usize,
    pub block_size: u64,
    pub max_file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iops_reads: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_ops: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_percent: Option<u8>,
    pub fail_fast: bool,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

/// Session lifetime percentiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLifetimes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p50: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p90: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99: Option<JsonDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<JsonDuration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonModeTotals {
    pub tasks: usize,
    pub completed: usize,
    pub bytes_moved: u64,
    pub bytes_written: u64,
    pub files_churned: u64,
}

impl From<&ModeTotals> for JsonModeTotals {
    fn from(t: &ModeTotals) -> Self {
        Self {
            tasks: t.tasks,
            completed: t.completed,
            bytes_moved: t.bytes_moved,
            bytes_written: t.bytes_written,
            files_churned: t.files_churned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSummary {
    pub hostname: String,
    pub tasks_attempted: usize,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    pub sessions_established: usize,
    pub sessions_failed: usize,
    pub bytes_moved: u64,
    pub bytes_moved_human: String,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub files_churned: u64,
    pub skipped_reads: u64,
    pub elapsed: JsonDuration,
    pub throughput: JsonThroughput,
    pub write_throughput: JsonThroughput,
    pub iops: f64,
    pub modes: Vec<String>,
    pub per_mode: BTreeMap<String, JsonModeTotals>,
    pub session_lifetimes: JsonLifetimes,
    pub stopped_early: bool,
    pub no_data_moved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTaskResult {
    pub task_index: usize,
    pub mode: String,
    pub bytes_transferred: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub files_created: u64,
    pub skipped_reads: u64,
    pub duration: JsonDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<TaskPhase>,
}

/// Top-level JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRunOutput {
    /// RFC 3339 time the document was written
    pub generated_at: String,
    pub config: JsonRunConfig,
    pub summary: JsonSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<JsonTaskResult>>,
}

/// Build JsonRunConfig from Config
pub fn build_run_config(config: &Config) -> JsonRunConfig {
    use crate::config::Mode;

    let workload = &config.workload;
    JsonRunConfig {
        server: config.share.server.clone(),
        share: config.share.share.clone(),
        backend: config.share.backend.to_string(),
        client_id: config.runtime.client_id.clone(),
        mode: workload.mode.label().to_string(),
        num_tasks: workload.num_tasks,
        block_size: workload.block_size,
        max_file_size: workload.max_file_size,
        iops_reads: (workload.mode == Mode::ReadIops).then_some(workload.iops_reads),
        random_ops: (workload.mode == Mode::RandomIo).then_some(workload.random_ops),
        read_percent: (workload.mode == Mode::RandomIo).then_some(workload.read_percent),
        fail_fast: config.runtime.fail_fast,
        retry_attempts: config.runtime.retry.max_attempts,
        retry_delay_ms: config.runtime.retry.delay_ms,
    }
}

pub fn build_summary(summary: &Summary) -> JsonSummary {
    let lifetimes = &summary.session_lifetimes;
    JsonSummary {
        hostname: summary.hostname.clone(),
        tasks_attempted: summary.tasks_attempted,
        tasks_completed: summary.tasks_completed,
        tasks_failed: summary.tasks_failed,
        sessions_established: summary.sessions_established,
        sessions_failed: summary.sessions_failed,
        bytes_moved: summary.bytes_moved,
        bytes_moved_human: format_bytes(summary.bytes_moved),
        bytes_read: summary.bytes_read,
        bytes_written: summary.bytes_written,
        files_churned: summary.files_churned,
        skipped_reads: summary.skipped_reads,
        elapsed: JsonDuration::from_duration(summary.elapsed),
        throughput: JsonThroughput::new(summary.throughput),
        write_throughput: JsonThroughput::new(summary.write_throughput),
        iops: summary.iops,
        modes: summary.modes.iter().map(|m| m.label().to_string()).collect(),
        per_mode: summary
            .per_mode
            .iter()
            .map(|(mode, totals)| (mode.label().to_string(), JsonModeTotals::from(totals)))
            .collect(),
        session_lifetimes: JsonLifetimes {
            p50: lifetimes.p50.map(JsonDuration::from_duration),
            p90: lifetimes.p90.map(JsonDuration::from_duration),
            p99: lifetimes.p99.map(JsonDuration::from_duration),
            max: lifetimes.max.map(JsonDuration::from_duration),
        },
        stopped_early: summary.stopped_early,
        no_data_moved: summary.no_data_moved,
    }
}

pub fn build_task_result(result: &TaskResult) -> JsonTaskResult {
    JsonTaskResult {
        task_index: result.task_index,
        mode: result.mode.label().to_string(),
        bytes_transferred: result.bytes_transferred,
        bytes_read: result.bytes_read,
        bytes_written: result.bytes_written,
        files_created: result.files_created,
        skipped_reads: result.skipped_reads,
        duration: JsonDuration::from_duration(result.duration),
        error: result.failure.as_ref().map(|f| f.message.clone()),
        failed_phase: result.failure.as_ref().map(|f| f.phase),
    }
}

/// Assemble the full document; tasks are sorted by index
pub fn build_run_output(config: &Config, summary: &Summary, tasks: Option<&[TaskResult]>) -> JsonRunOutput {
    let tasks = tasks.map(|results| {
        let mut tasks: Vec<_> = results.iter().map(build_task_result).collect();
        tasks.sort_by_key(|t| t.task_index);
        tasks
    });

    JsonRunOutput {
        generated_at: chrono::Local::now().to_rfc3339(),
        config: build_run_config(config),
        summary: build_summary(summary),
        tasks,
    }
}

/// Write JSON output to file
pub fn write_json_output(output_path: &Path, output: &JsonRunOutput) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, output)
        .with_context(|| format!("Failed to write JSON output: {}", output_path.display()))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::stats::aggregator::Aggregator;
    use crate::workload::WorkloadOutcome;

    fn results() -> Vec<TaskResult> {
        let outcome = WorkloadOutcome {
            bytes_read: 4096,
            bytes_written: 4096,
            files_created: 11,
            skipped_reads: 0,
        };
        vec![
            TaskResult::failed(1, Mode::Default, TaskPhase::Connect, "refused", Duration::from_millis(3)),
            TaskResult::completed(0, Mode::Default, 4096, outcome, Duration::from_millis(40)),
        ]
    }

    fn summary(results: &[TaskResult]) -> Summary {
        let mut aggregator = Aggregator::new(results.len()).with_hostname("host-a");
        for r in results {
            aggregator.add(r);
        }
        aggregator.finish(Duration::from_secs(1))
    }

    #[test]
    fn test_run_output_shape() {
        let mut config = Config::default();
        config.share.credentials.password = "hunter2".to_string();
        let results = results();
        let output = build_run_output(&config, &summary(&results), Some(results.as_slice()));

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["summary"]["hostname"], "host-a");
        assert_eq!(value["summary"]["tasks_completed"], 1);
        assert_eq!(value["summary"]["sessions_failed"], 1);
        assert_eq!(value["config"]["mode"], "default");
        assert!(value["config"].get("iops_reads").is_none());

        let tasks = value["tasks"].as_array().unwrap();
        assert_eq!(tasks[0]["task_index"], 0);
        assert!(tasks[0].get("error").is_none());
        assert_eq!(tasks[1]["failed_phase"], "connect");

        assert!(!serde_json::to_string(&output).unwrap().contains("hunter2"));
    }

    #[test]
    fn test_tasks_omitted() {
        let results = results();
        let output = build_run_output(&Config::default(), &summary(&results), None);
        let value = serde_json::to_value(&output).unwrap();
        assert!(value.get("tasks").is_none());
    }

    #[test]
    fn test_write_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let results = results();
        let output = build_run_output(&Config::default(), &summary(&results), Some(results.as_slice()));

        write_json_output(&path, &output).unwrap();
        let parsed: JsonRunOutput = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.summary.files_churned, 11);
        assert_eq!(parsed.tasks.unwrap().len(), 2);
    }
}
