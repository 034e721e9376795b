//! Bounded retry for fallible remote operations
//!
//! Transient failures (momentary share unavailability, oplock breaks, busy
//! servers) are routine when hundreds of sessions hit one server. A
//! [`RetryPolicy`] re-runs an operation a bounded number of times with a fixed
//! delay between attempts and hands the last error back to the caller once the
//! attempts are exhausted.
//!
//! Retry is applied explicitly at each call site through [`with_retry`]:
//!
//! ```
//! use tempest::util::retry::{with_retry, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, Duration::ZERO);
//! let mut calls = 0;
//! let value = with_retry(&policy, "flaky", || {
//!     calls += 1;
//!     if calls < 3 { Err("busy") } else { Ok(calls) }
//! });
//! assert_eq!(value, Ok(3));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

/// Retry policy: fixed delay, bounded attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Sleep between consecutive attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Single attempt, no retry
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Policy used when polling a file's size after a write
    pub fn size_verification() -> Self {
        Self::new(10, Duration::from_millis(500))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(2))
    }
}

/// Execute `op` up to `policy.max_attempts` times
///
/// Each failure is logged at debug level with the attempt number. The delay is
/// applied between attempts only, never after the last one. When every attempt
/// fails the error from the final attempt is returned.
pub fn with_retry<T, E, F>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                tracing::debug!(
                    "Retryable failure in {} (attempt {}/{}): {}",
                    label,
                    attempt,
                    max_attempts,
                    e
                );
                if !policy.delay.is_zero() {
                    std::thread::sleep(policy.delay);
                }
                attempt += 1;
            }
            Err(e) => {
                tracing::debug!(
                    "{} failed after {} attempt(s): {}",
                    label,
                    max_attempts,
                    e
                );
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_succeeds_on_last_attempt() {
        let policy = RetryPolicy::new(4, Duration::ZERO);
        let mut attempts = 0;
        let result: Result<u32, String> = with_retry(&policy, "op", || {
            attempts += 1;
            if attempts < 4 {
                Err(format!("failure {}", attempts))
            } else {
                Ok(attempts)
            }
        });
        assert_eq!(result, Ok(4));
        assert_eq!(attempts, 4);
    }

    #[test]
    fn test_always_failing_surfaces_last_error() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut attempts = 0;
        let result: Result<(), String> = with_retry(&policy, "op", || {
            attempts += 1;
            Err(format!("failure {}", attempts))
        });
        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(attempts, 3);
    }

    #[test]
    fn test_first_success_no_retry() {
        let policy = RetryPolicy::new(5, Duration::from_secs(60));
        let mut attempts = 0;
        let result: Result<&str, String> = with_retry(&policy, "op", || {
            attempts += 1;
            Ok("done")
        });
        assert_eq!(result, Ok("done"));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let policy = RetryPolicy {
            max_attempts: 0,
            delay: Duration::ZERO,
        };
        let mut attempts = 0;
        let result: Result<(), &str> = with_retry(&policy, "op", || {
            attempts += 1;
            Err("nope")
        });
        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_delay_between_attempts_only() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let start = Instant::now();
        let result: Result<(), &str> = with_retry(&policy, "op", || Err("nope"));
        let elapsed = start.elapsed();
        assert!(result.is_err());
        // Two sleeps for three attempts
        assert!(elapsed >= Duration::from_millis(40));
        assert!(elapsed < Duration::from_millis(1000));
    }

    #[test]
    fn test_none_policy() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delay, Duration::ZERO);
    }
}
