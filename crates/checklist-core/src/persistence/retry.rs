//! Retry policies and backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// `attempt * delay`
    Linear,
    /// `delay * 2^(attempt - 1)`
    Exponential,
}

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Base delay
    pub delay: Duration,
    pub backoff: Backoff,
}

/// Base delay used by the default policies.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Attempts used by the default policies.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

impl RetryPolicy {
    /// Default policy for loads: linear backoff.
    pub fn reads() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            backoff: Backoff::Linear,
        }
    }

    /// Default policy for saves: exponential backoff.
    pub fn writes() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            backoff: Backoff::Exponential,
        }
    }

    /// Wait before the next attempt after `attempt` (1-based) failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff {
            Backoff::Linear => self.delay.saturating_mul(attempt),
            Backoff::Exponential => {
                let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                self.delay.saturating_mul(factor)
            }
        }
    }
}

/// Blocks the current session between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(100),
            backoff: Backoff::Linear,
        };
        let delays: Vec<_> = (1..=4).map(|a| policy.delay_after(a).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 300, 400]);
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(100),
            backoff: Backoff::Exponential,
        };
        let delays: Vec<_> = (1..=4).map(|a| policy.delay_after(a).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800]);
    }

    #[test]
    fn test_default_policies() {
        assert_eq!(RetryPolicy::reads().max_attempts, 5);
        assert_eq!(RetryPolicy::reads().backoff, Backoff::Linear);
        assert_eq!(RetryPolicy::writes().backoff, Backoff::Exponential);
    }

    #[test]
    fn test_exponential_backoff_does_not_overflow() {
        let policy = RetryPolicy::writes();
        assert!(policy.delay_after(64) >= Duration::from_secs(1_000_000));
    }
}
