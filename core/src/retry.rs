//! Retry orchestration with capped exponential backoff.
//!
//! # Design
//! `RetryPolicy::run` makes up to `max_retries + 1` strictly sequential
//! attempts. Before attempt `n > 0` it waits `min(base * 2^(n-1), max)`;
//! the wait races against the caller's `Context`, so cancellation ends the
//! sequence with the cancellation cause instead of `RetriesExhausted`.
//!
//! Classification:
//! - a 4xx `Error::Http` is permanent and returned unchanged,
//! - a cancellation error ends the sequence immediately,
//! - everything else (transport failures, 5xx, ...) is retried.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::DEFAULT_MAX_RETRIES;
use crate::context::Context;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = a single attempt).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before attempt `attempt` (0-indexed). Attempt 0 never waits.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        1u32.checked_shl(attempt - 1)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Run `operation` until it succeeds, fails permanently, the context is
    /// done, or the attempts run out.
    pub async fn run<F, Fut, T>(&self, ctx: &Context, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                let delay = self.delay_for_attempt(attempt);
                ctx.check()?;
                tokio::select! {
                    biased;
                    cause = ctx.done() => return Err(cause.into()),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let err = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} attempts", attempt + 1);
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if err.is_permanent() {
                debug!("Not retrying permanent failure: {}", err);
                return Err(err);
            }
            if err.is_cancelled() {
                return Err(err);
            }
            if let Some(cause) = ctx.err() {
                return Err(cause.into());
            }

            attempt += 1;
            if attempt >= max_attempts {
                warn!("All {} attempts failed. Last error: {}", attempt, err);
                return Err(Error::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            warn!(
                "Attempt {}/{} failed: {}. Retrying in {:?}",
                attempt,
                max_attempts,
                err,
                self.delay_for_attempt(attempt)
            );
        }
    }
}
