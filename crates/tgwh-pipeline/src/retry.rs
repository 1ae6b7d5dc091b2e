//! Per-stage retry policy.

use std::time::Duration;

use tgwh_core::{AppConfig, BackoffKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per stage, at least 1.
    pub max_attempts: u32,
    pub backoff: BackoffKind,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound on a single attempt.
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.stage_max_attempts.max(1),
            backoff: config.stage_backoff,
            base_delay: Duration::from_secs(config.stage_backoff_base_secs),
            max_delay: Duration::from_secs(config.stage_backoff_max_secs),
            attempt_timeout: Duration::from_secs(config.stage_timeout_secs),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    ///
    /// Fixed: always `base_delay`. Exponential: `base_delay * 2^(attempt-1)`.
    /// Both are capped at `max_delay`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            BackoffKind::Fixed => self.base_delay,
            BackoffKind::Exponential => {
                let factor = 1u32 << attempt.saturating_sub(1).min(20);
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(backoff: BackoffKind) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            backoff,
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(100),
            attempt_timeout: Duration::from_secs(3600),
        }
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let p = policy(BackoffKind::Fixed);
        assert_eq!(p.delay_after(1), Duration::from_secs(30));
        assert_eq!(p.delay_after(4), Duration::from_secs(30));
    }

    #[test]
    fn exponential_backoff_doubles_then_caps() {
        let p = policy(BackoffKind::Exponential);
        assert_eq!(p.delay_after(1), Duration::from_secs(30));
        assert_eq!(p.delay_after(2), Duration::from_secs(60));
        assert_eq!(p.delay_after(3), Duration::from_secs(100));
        assert_eq!(p.delay_after(40), Duration::from_secs(100));
    }
}
