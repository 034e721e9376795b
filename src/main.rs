//! Tempest CLI entry point

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tempest::config::cli::Cli;
use tempest::config::{toml, validator, BackendType, Config};
use tempest::output::{json, text};
use tempest::session::local::LocalConnector;
use tempest::session::mock::MockConnector;
use tempest::session::ShareConnector;
use tempest::util::{identity, logging};

fn main() -> Result<ExitCode> {
    println!("Tempest v{}", env!("CARGO_PKG_VERSION"));
    println!("Concurrent session and IO load generator for file shares");
    println!();

    // Parse CLI arguments
    let cli = Cli::parse_args();
    cli.validate()?;

    let mut config = toml::load_config(&cli)?;

    let log_path = logging::init_logging(&config.output.log_dir, config.runtime.debug)?;
    println!("Log file: {}", log_path.display());

    if config.runtime.client_id.trim().is_empty() {
        config.runtime.client_id = identity::load_or_create_client_id(&config.runtime.client_id_file)?;
    }

    validator::validate_config(&config).context("Configuration validation failed")?;

    print!("{}", config);
    if config.runtime.dry_run {
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    println!("Starting run...");
    println!();

    let config = Arc::new(config);
    let report = run(&config);

    text::print_summary(&report.summary);

    if let Some(ref path) = config.output.json_output {
        let output = json::build_run_output(&config, &report.summary, Some(report.results.as_slice()));
        json::write_json_output(path, &output)?;
        println!("JSON results written to {}", path.display());
    }

    if report.summary.is_idle() {
        tracing::warn!("Run moved no data");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn run(config: &Arc<Config>) -> tempest::RunReport {
    let connector: Arc<dyn ShareConnector> = match config.share.backend {
        BackendType::Local => Arc::new(LocalConnector::new()),
        BackendType::Mock => Arc::new(MockConnector::new()),
    };

    let verbose = config.output.verbose;
    tempest::run_load(config, connector, |result| {
        if verbose {
            println!("{}", text::format_task_result(result));
        }
    })
}
