//! Bounded exponential backoff shared by the blocking and async call paths.
//!
//! The policy decides what happens after each attempt. The caller only
//! chooses how to wait: a thread sleep or a cooperative suspension.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::error::{EncoderError, Result};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Retry policy for provider calls.
///
/// A call is attempted at most `max_retries + 1` times. The wait before retry
/// `j` (counting from zero) is `unit * 2^j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, Duration::from_secs(1))
    }
}

/// What to do after an attempt.
enum Step<T> {
    Finish(Result<T>),
    Wait(Duration),
}

impl RetryPolicy {
    /// Create a new policy.
    pub fn new(max_retries: u32, unit: Duration) -> Self {
        Self { max_retries, unit }
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.unit.saturating_mul(2u32.saturating_pow(retry))
    }

    fn step<T>(&self, attempt: u32, result: Result<T>) -> Step<T> {
        match result {
            Ok(value) => Step::Finish(Ok(value)),
            Err(err) if err.is_transient() => {
                error!(
                    "Embedding attempt {} of {} failed: {err}",
                    attempt + 1,
                    self.max_attempts()
                );
                if attempt < self.max_retries {
                    let delay = self.delay_for(attempt);
                    warn!("Retrying in {delay:?} due to {err}");
                    Step::Wait(delay)
                } else {
                    Step::Finish(Err(err))
                }
            }
            Err(EncoderError::Provider(source)) => {
                error!("Embedding call failed: {source}");
                Step::Finish(Err(EncoderError::ProviderCall { source }))
            }
            Err(err) => Step::Finish(Err(err)),
        }
    }

    /// Run `op`, blocking the current thread between attempts.
    pub fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        self.run_blocking_with(op, std::thread::sleep)
    }

    /// Run `op`, calling `suspend` between attempts.
    pub fn run_blocking_with<T, F, S>(&self, mut op: F, mut suspend: S) -> Result<T>
    where
        F: FnMut() -> Result<T>,
        S: FnMut(Duration),
    {
        let mut attempt = 0;
        loop {
            match self.step(attempt, op()) {
                Step::Finish(result) => return result,
                Step::Wait(delay) => {
                    suspend(delay);
                    attempt += 1;
                }
            }
        }
    }

    /// Run `op`, yielding to the tokio scheduler between attempts.
    pub async fn run_async<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_async_with(op, tokio::time::sleep).await
    }

    /// Run `op`, awaiting `suspend` between attempts.
    pub async fn run_async_with<T, F, Fut, S, SFut>(&self, mut op: F, mut suspend: S) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        S: FnMut(Duration) -> SFut,
        SFut: Future<Output = ()>,
    {
        let mut attempt = 0;
        loop {
            match self.step(attempt, op().await) {
                Step::Finish(result) => return result,
                Step::Wait(delay) => {
                    suspend(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
