//! Bounded retry with backoff for external calls
//!
//! Every attempt races the cancellation token and, when configured, a
//! per-attempt timeout. Sleeps between attempts are cancellable too.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{BookforgeError, Result};

/// Delay schedule between attempts
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential {
        initial: Duration,
        max: Duration,
        multiplier: f64,
    },
}

impl Backoff {
    /// Delay to wait after the `failed_attempt`-th failure (1-based)
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial, max, multiplier } => {
                let exponent = failed_attempt.saturating_sub(1) as i32;
                let ms = initial.as_millis() as f64 * multiplier.powi(exponent);
                Duration::from_millis(ms as u64).min(*max)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub attempt_timeout: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
            attempt_timeout: None,
        }
    }

    /// A single attempt, no retry
    pub fn once() -> Self {
        Self::new(1, Backoff::Fixed(Duration::ZERO))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }
}

#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { last_error: BookforgeError, attempts: u32 },
    Cancelled { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Succeeded { value, .. } => Ok(value),
            Self::Exhausted { last_error, .. } => Err(last_error),
            Self::Cancelled { .. } => Err(BookforgeError::Cancelled),
        }
    }
}

/// Run `op` until it succeeds, the attempt budget is spent, the error is not
/// retryable, or `cancel` fires. `op` receives the 1-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut op: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("{}: cancelled before attempt {} completed", label, attempt);
                return RetryOutcome::Cancelled { attempts: attempt };
            }
            result = run_attempt(op(attempt), policy.attempt_timeout, label) => result,
        };

        let error = match result {
            Ok(value) => {
                if attempt > 1 {
                    log::info!("{}: succeeded on attempt {}", label, attempt);
                }
                return RetryOutcome::Succeeded { value, attempts: attempt };
            }
            Err(e) => e,
        };

        log::warn!("{}: attempt {}/{} failed: {}", label, attempt, max_attempts, error);

        if attempt >= max_attempts || !error.is_retryable() {
            return RetryOutcome::Exhausted { last_error: error, attempts: attempt };
        }

        let delay = policy.backoff.delay_after(attempt);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return RetryOutcome::Cancelled { attempts: attempt },
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn run_attempt<T, Fut>(fut: Fut, timeout: Option<Duration>, label: &str) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(BookforgeError::Timeout(format!("{} exceeded {:?}", label, limit))),
        },
        None => fut.await,
    }
}
