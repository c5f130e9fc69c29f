//! Retry policies for failed jobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Never retry.
    None,
    /// Same delay every time.
    Fixed,
    /// `initial * attempt`.
    Linear,
    /// `initial * multiplier^(attempt - 1)`.
    Exponential,
}

/// Retry policy stored alongside each job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub strategy: RetryStrategy,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// Fraction of the delay to randomize, 0.0 disables jitter.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3)
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            strategy: RetryStrategy::None,
            max_retries: 0,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Constant delay between retries.
    #[must_use]
    pub const fn fixed(max_retries: u32, delay: Duration) -> Self {
        let ms = duration_ms(delay);
        Self {
            strategy: RetryStrategy::Fixed,
            max_retries,
            initial_delay_ms: ms,
            max_delay_ms: ms,
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Delay grows by `step` per attempt.
    #[must_use]
    pub const fn linear(max_retries: u32, step: Duration) -> Self {
        let ms = duration_ms(step);
        Self {
            strategy: RetryStrategy::Linear,
            max_retries,
            initial_delay_ms: ms,
            max_delay_ms: ms.saturating_mul(max_retries as u64),
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Doubling delay from one second, capped at one hour, 10% jitter.
    #[must_use]
    pub const fn exponential(max_retries: u32) -> Self {
        Self {
            strategy: RetryStrategy::Exponential,
            max_retries,
            initial_delay_ms: 1_000,
            max_delay_ms: 3_600_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }

    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = duration_ms(delay);
        self
    }

    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = duration_ms(delay);
        self
    }

    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }

    /// True if a job that just failed its `attempt`-th run (1-based) may run again.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.strategy != RetryStrategy::None && attempt <= self.max_retries
    }

    /// Delay before the run following failed attempt `attempt`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base = match self.strategy {
            RetryStrategy::None => return Duration::ZERO,
            RetryStrategy::Fixed => self.initial_delay_ms,
            RetryStrategy::Linear => self.initial_delay_ms.saturating_mul(u64::from(attempt)),
            RetryStrategy::Exponential => {
                let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
                let raw = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
                if raw.is_finite() && raw < u64::MAX as f64 {
                    raw as u64
                } else {
                    u64::MAX
                }
            }
        };
        let capped = base.min(self.max_delay_ms);

        if self.jitter_factor <= 0.0 || capped == 0 {
            return Duration::from_millis(capped);
        }

        // Spread uniformly over [capped - range/2, capped + range/2).
        let range = (capped as f64 * self.jitter_factor) as u64;
        if range == 0 {
            return Duration::from_millis(capped);
        }
        let offset = (Uuid::new_v4().as_u128() % u128::from(range)) as u64;
        Duration::from_millis(capped.saturating_sub(range / 2).saturating_add(offset))
    }
}

const fn duration_ms(duration: Duration) -> u64 {
    let ms = duration.as_millis();
    if ms > u64::MAX as u128 {
        u64::MAX
    } else {
        ms as u64
    }
}
