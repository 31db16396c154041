//! Fault classification and retry policy
//!
//! Every remote call site goes through [`RetryPolicy::run`], which consults
//! [`classify`] to decide whether a fault is retried in place, skipped, or
//! fatal.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::source::SourceError;

/// Three-way fault taxonomy
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FaultClass {
    /// Retry in place
    Retryable,
    /// Abandon the current target, continue with the next
    Skip,
    /// Terminate the process
    Fatal,
}

pub fn classify(err: &SourceError) -> FaultClass {
    match err {
        SourceError::RateLimited { .. } | SourceError::Timeout | SourceError::Transport(_) => {
            FaultClass::Retryable
        }
        SourceError::Unauthorized | SourceError::Status { code: 401 } => FaultClass::Fatal,
        SourceError::Status { code } if *code >= 500 || *code == 408 => FaultClass::Retryable,
        SourceError::Status { .. } | SourceError::Redirect | SourceError::Decode(_) => FaultClass::Skip,
    }
}

/// Retry policy with capped exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// None retries until the remote succeeds or returns a non-retryable fault
    pub max_attempts: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(5), Duration::from_secs(60))
    }
}

impl RetryPolicy {
    pub fn unbounded(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: None,
            base_delay,
            max_delay,
            jitter: true,
        }
    }

    pub fn bounded(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::unbounded(base_delay, max_delay)
        }
    }

    /// No sleeping between attempts (tests and benches)
    pub fn immediate() -> Self {
        Self {
            max_attempts: None,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if self.jitter && !delay.is_zero() {
            let scale = rand::rng().random_range(0.75..=1.25);
            delay.mul_f64(scale)
        } else {
            delay
        }
    }

    fn cooldown(&self, err: &SourceError, attempt: u32) -> Duration {
        match err.retry_after() {
            Some(hint) => hint.min(self.max_delay),
            None => self.delay_for(attempt),
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable fault, or
    /// attempts run out. Returns the last fault on failure.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if classify(&err) != FaultClass::Retryable {
                return Err(err);
            }

            attempt += 1;
            if self.max_attempts.is_some_and(|max| attempt >= max) {
                return Err(err);
            }

            let delay = self.cooldown(&err, attempt - 1);
            warn!(call = label, attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying remote call");
            tokio::time::sleep(delay).await;
        }
    }
}
