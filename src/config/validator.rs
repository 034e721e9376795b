//! Configuration validation

use super::*;
use anyhow::Result;

/// Largest accepted block size
const MAX_BLOCK_SIZE: u64 = 64 * 1024 * 1024;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_share(&config.share)?;
    validate_workload(&config.workload)?;
    validate_runtime(&config.runtime)?;
    Ok(())
}

/// Validate share configuration
pub fn validate_share(share: &ShareConfig) -> Result<()> {
    if share.server.trim().is_empty() {
        anyhow::bail!("server must be specified");
    }
    if share.share.trim().is_empty() {
        anyhow::bail!("share must be specified");
    }
    Ok(())
}

/// Validate workload configuration
pub fn validate_workload(workload: &WorkloadConfig) -> Result<()> {
    if workload.block_size == 0 {
        anyhow::bail!("block_size must be greater than 0");
    }

    if workload.block_size > MAX_BLOCK_SIZE {
        anyhow::bail!(
            "block_size must be <= 64MB, got {}",
            workload.block_size
        );
    }

    if workload.max_file_size == 0 {
        anyhow::bail!("max_file_size must be greater than 0");
    }

    if workload.read_workers == 0 {
        anyhow::bail!("read_workers must be at least 1");
    }

    match workload.mode {
        Mode::RandomIo => {
            if workload.read_percent > 100 {
                anyhow::bail!(
                    "read_percent must be between 0 and 100, got {}",
                    workload.read_percent
                );
            }
            if workload.max_file_size < workload.block_size {
                anyhow::bail!(
                    "random-io needs max_file_size ({}) >= block_size ({})",
                    workload.max_file_size,
                    workload.block_size
                );
            }
        }
        Mode::Default => {
            if workload.churn_min > workload.churn_max {
                anyhow::bail!(
                    "churn_min ({}) must not exceed churn_max ({})",
                    workload.churn_min,
                    workload.churn_max
                );
            }
        }
        Mode::StreamingReads | Mode::ReadIops | Mode::StreamingWrites => {}
    }

    if workload.num_tasks == 0 {
        tracing::warn!("num_tasks is 0: the run will not open any sessions");
    }

    Ok(())
}

/// Validate runtime configuration
pub fn validate_runtime(runtime: &RuntimeConfig) -> Result<()> {
    if runtime.retry.max_attempts == 0 {
        anyhow::bail!("retry max_attempts must be at least 1");
    }

    if runtime.client_id.trim().is_empty() {
        anyhow::bail!("client id must be resolved before the run starts");
    }

    if runtime.client_id.contains(['/', '\\']) || runtime.client_id.contains("..") {
        anyhow::bail!("client id must be a single path component, got {}", runtime.client_id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.share.server = "nas01".to_string();
        config.share.share = "tempest".to_string();
        config.runtime.client_id = "0b6c3b2e-client".to_string();
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_server() {
        let mut config = valid_config();
        config.share.server.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_block_size() {
        let mut config = valid_config();
        config.workload.block_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_random_io_read_percent() {
        let mut config = valid_config();
        config.workload.mode = Mode::RandomIo;
        config.workload.read_percent = 101;
        assert!(validate_config(&config).is_err());

        config.workload.read_percent = 100;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_random_io_file_smaller_than_block() {
        let mut config = valid_config();
        config.workload.mode = Mode::RandomIo;
        config.workload.block_size = 1024 * 1024;
        config.workload.max_file_size = 4096;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_churn_bounds() {
        let mut config = valid_config();
        config.workload.churn_min = 50;
        config.workload.churn_max = 10;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_tasks_allowed() {
        let mut config = valid_config();
        config.workload.num_tasks = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_unresolved_client_id() {
        let mut config = valid_config();
        config.runtime.client_id.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_client_id_with_separator() {
        let mut config = valid_config();
        config.runtime.client_id = "../escape".to_string();
        assert!(validate_config(&config).is_err());
    }
}
