//! Reconnection policy for the real-time connection.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::duration_ms;

/// Default number of reconnect attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default delay between reconnect attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

/// How and how often to reconnect after a failed or lost connection.
///
/// The first connection attempt is immediate. Reconnect attempt `n`
/// (starting at 1) waits `delay_min * n`, capped at `delay_max`, optionally
/// randomized by `randomization_factor`. The default is ten attempts with a
/// fixed two second delay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Maximum reconnect attempts; `None` retries forever, `Some(0)` never retries.
    pub max_attempts: Option<u32>,
    /// Delay before the first reconnect attempt.
    #[serde(with = "duration_ms")]
    pub delay_min: Duration,
    /// Upper bound for any single delay.
    #[serde(with = "duration_ms")]
    pub delay_max: Duration,
    /// Jitter in `[0, 1]`; each delay is scaled by a random factor in `1 ± randomization_factor`.
    pub randomization_factor: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_MAX_ATTEMPTS, DEFAULT_DELAY)
    }
}

impl ReconnectPolicy {
    /// A bounded number of attempts with a constant delay.
    #[must_use]
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            delay_min: delay,
            delay_max: delay,
            randomization_factor: 0.0,
        }
    }

    /// Unlimited attempts with a delay growing linearly from `delay_min` to `delay_max`.
    #[must_use]
    pub const fn unlimited(delay_min: Duration, delay_max: Duration) -> Self {
        Self {
            max_attempts: None,
            delay_min,
            delay_max,
            randomization_factor: 0.0,
        }
    }

    /// Never reconnect.
    #[must_use]
    pub const fn disabled() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// Set the jitter factor.
    #[must_use]
    pub const fn with_randomization(mut self, factor: f64) -> Self {
        self.randomization_factor = factor;
        self
    }

    /// Whether reconnect attempt `attempt` (1-based) is allowed.
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self
            .delay_min
            .saturating_mul(attempt.max(1))
            .min(self.delay_max.max(self.delay_min));

        let factor = self.randomization_factor.clamp(0.0, 1.0);
        if factor <= 0.0 {
            return base;
        }
        let scale = rand::thread_rng().gen_range((1.0 - factor)..=(1.0 + factor));
        base.mul_f64(scale).min(self.delay_max.max(self.delay_min))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts, Some(10));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(7), Duration::from_millis(2000));
        assert!(policy.allows(10));
        assert!(!policy.allows(11));
    }

    #[test]
    fn test_linear_growth_is_capped() {
        let policy =
            ReconnectPolicy::unlimited(Duration::from_millis(1000), Duration::from_millis(5000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(3000));
        assert_eq!(policy.delay_for(9), Duration::from_millis(5000));
        assert!(policy.allows(u32::MAX));
    }

    #[test]
    fn test_disabled_never_allows() {
        assert!(!ReconnectPolicy::disabled().allows(1));
    }

    #[test]
    fn test_jitter_stays_in_window() {
        let policy =
            ReconnectPolicy::unlimited(Duration::from_millis(1000), Duration::from_millis(5000))
                .with_randomization(0.5);
        for _ in 0..50 {
            let delay = policy.delay_for(2);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(3000));
        }
    }
}
