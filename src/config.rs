use std::time::Duration;

/// Exponential backoff between attempts of a bounded wait or a retry loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Pause after the first failed attempt.
    pub initial: Duration,
    /// Upper bound for a single pause.
    pub max: Duration,
    /// Growth factor applied after every failed attempt.
    pub multiplier: u32,
    /// Attempts before a retry loop gives up. Timed waits ignore this and
    /// stop at their deadline instead.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_micros(50),
            max: Duration::from_millis(10),
            multiplier: 2,
            max_attempts: 16,
        }
    }
}

impl BackoffConfig {
    /// Short pauses for critical sections expected to finish in microseconds.
    pub const fn low_latency() -> Self {
        Self {
            initial: Duration::from_micros(5),
            max: Duration::from_micros(500),
            multiplier: 2,
            max_attempts: 64,
        }
    }

    /// Pause to use after `attempt` failures (0-based), capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Tuning for [`crate::FairResource`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FairResourceConfig {
    /// Time the lock is held while a withdrawal is "processed".
    pub processing_delay: Duration,
    /// Granularity at which a processing delay checks for cancellation.
    pub poll_interval: Duration,
    /// Backoff for timed acquisition and `withdraw_with_retry`.
    pub backoff: BackoffConfig,
}

impl Default for FairResourceConfig {
    fn default() -> Self {
        Self {
            processing_delay: Duration::from_secs(3),
            poll_interval: Duration::from_millis(5),
            backoff: BackoffConfig::default(),
        }
    }
}

impl FairResourceConfig {
    /// No simulated processing time.
    pub const fn instant() -> Self {
        Self {
            processing_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
            backoff: BackoffConfig::low_latency(),
        }
    }

    pub const fn with_processing_delay(self, processing_delay: Duration) -> Self {
        Self {
            processing_delay,
            ..self
        }
    }

    pub const fn with_backoff(self, backoff: BackoffConfig) -> Self {
        Self { backoff, ..self }
    }
}
