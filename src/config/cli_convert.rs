//! CLI to Config conversion utilities

use crate::config::cli::{BackendArg, Cli};
use crate::config::{BackendType, Mode};
use anyhow::{Context, Result};

/// Parse a size string (e.g., "1G", "100M", "4k") to bytes
///
/// Bare numbers are bytes.
pub fn parse_size(s: &str) -> Result<u64> {
    parse_size_with_unit(s, 1)
}

/// Parse a size string where a bare number is a count of `unit` bytes
///
/// The file-size option takes MiB when no suffix is given.
pub fn parse_size_with_unit(s: &str, unit: u64) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with("kb") || s.ends_with('k') {
        (s.trim_end_matches("kb").trim_end_matches('k'), 1024u64)
    } else if s.ends_with("mb") || s.ends_with('m') {
        (s.trim_end_matches("mb").trim_end_matches('m'), 1024 * 1024)
    } else if s.ends_with("gb") || s.ends_with('g') {
        (s.trim_end_matches("gb").trim_end_matches('g'), 1024 * 1024 * 1024)
    } else if s.ends_with("tb") || s.ends_with('t') {
        (s.trim_end_matches("tb").trim_end_matches('t'), 1024 * 1024 * 1024 * 1024)
    } else if s.ends_with('b') {
        (s.trim_end_matches('b'), 1)
    } else {
        (s.as_str(), unit)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Size out of range: {}", s))
}

/// Parse a duration string (e.g., "500ms", "2s", "1m") to milliseconds
///
/// Bare numbers are seconds.
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with("ms") {
        (s.trim_end_matches("ms"), 1u64)
    } else if s.ends_with("sec") || s.ends_with('s') {
        (s.trim_end_matches("sec").trim_end_matches('s'), 1000)
    } else if s.ends_with("min") || s.ends_with('m') {
        (s.trim_end_matches("min").trim_end_matches('m'), 60_000)
    } else {
        (s.as_str(), 1000)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Duration out of range: {}", s))
}

/// Resolve the mutually exclusive mode flags into a single mode
///
/// Returns `None` when no mode flag was given, leaving the file (or default)
/// mode in place. clap's argument group already rejects multiple flags.
pub fn mode_from_flags(cli: &Cli) -> Option<Mode> {
    if cli.streaming_reads {
        Some(Mode::StreamingReads)
    } else if cli.read_iops {
        Some(Mode::ReadIops)
    } else if cli.streaming_writes {
        Some(Mode::StreamingWrites)
    } else if cli.random_io {
        Some(Mode::RandomIo)
    } else {
        None
    }
}

/// Convert CLI backend to config backend
pub fn convert_backend(arg: BackendArg) -> BackendType {
    match arg {
        BackendArg::Local => BackendType::Local,
        BackendArg::Mock => BackendType::Mock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("4k").unwrap(), 4096);
        assert_eq!(parse_size("4KB").unwrap(), 4096);
        assert_eq!(parse_size("1M").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("2g").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("512b").unwrap(), 512);
        assert!(parse_size("abc").is_err());
    }

    #[test]
    fn test_parse_size_with_unit() {
        let mib = 1024 * 1024;
        assert_eq!(parse_size_with_unit("10", mib).unwrap(), 10 * mib);
        assert_eq!(parse_size_with_unit("10M", mib).unwrap(), 10 * mib);
        assert_eq!(parse_size_with_unit("64k", mib).unwrap(), 64 * 1024);
    }

    #[test]
    fn test_parse_size_overflow() {
        assert!(parse_size("99999999999999t").is_err());
    }

    #[test]
    fn test_parse_duration_ms() {
        assert_eq!(parse_duration_ms("500ms").unwrap(), 500);
        assert_eq!(parse_duration_ms("2s").unwrap(), 2000);
        assert_eq!(parse_duration_ms("2").unwrap(), 2000);
        assert_eq!(parse_duration_ms("1m").unwrap(), 60_000);
        assert!(parse_duration_ms("soon").is_err());
    }

    #[test]
    fn test_parse_duration_ms_overflow() {
        let err = parse_duration_ms("999999999999999999m").unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert_eq!(parse_duration_ms("18446744073709551615ms").unwrap(), u64::MAX);
    }

    #[test]
    fn test_mode_from_flags() {
        let mut cli = Cli::default();
        assert_eq!(mode_from_flags(&cli), None);
        cli.read_iops = true;
        assert_eq!(mode_from_flags(&cli), Some(Mode::ReadIops));
    }
}
