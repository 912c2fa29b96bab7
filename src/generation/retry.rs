//! Bounded retry with exponential backoff and jitter.

use crate::error::{AudioError, GenerationError};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Error types that can express "the operation was cancelled".
pub trait Cancellable {
    fn cancelled() -> Self;
}

impl Cancellable for GenerationError {
    fn cancelled() -> Self {
        GenerationError::Cancelled
    }
}

impl Cancellable for AudioError {
    fn cancelled() -> Self {
        AudioError::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(300), Duration::from_secs(4), 0.2)
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one and `jitter_fraction` to
    /// `[0, 1]`; a non-finite fraction disables jitter.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        jitter_fraction: f64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            jitter_fraction: if jitter_fraction.is_finite() {
                jitter_fraction.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation` until it succeeds, fails with an error `should_retry`
    /// rejects, or attempts run out. Cancellation observed while backing off
    /// returns `E::cancelled()` without another attempt.
    pub async fn run<T, E, F, Fut>(
        &self,
        operation_name: &str,
        cancel: &watch::Receiver<bool>,
        should_retry: impl Fn(&E) -> bool,
        mut operation: F,
    ) -> Result<T, E>
    where
        E: Cancellable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= self.max_attempts || !should_retry(&err) {
                return Err(err);
            }

            let delay = self.delay_for(attempt, rand::random::<f64>());
            tracing::warn!(
                "{} failed (attempt {}/{}): {}. Retrying in {}ms",
                operation_name,
                attempt,
                self.max_attempts,
                err,
                delay.as_millis()
            );

            let mut cancel = cancel.clone();
            tokio::select! {
                _ = cancelled(&mut cancel) => return Err(E::cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    /// Backoff before retrying after failed attempt `attempt` (1-based).
    ///
    /// `unit` is a uniform sample from `[0, 1]` scaling the jitter.
    pub fn delay_for(&self, attempt: u32, unit: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let without_jitter = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        let jitter = without_jitter.mul_f64(self.jitter_fraction * unit.clamp(0.0, 1.0));
        without_jitter + jitter
    }
}

/// True if the cancel flag is currently raised.
pub fn is_cancelled(cancel: &watch::Receiver<bool>) -> bool {
    *cancel.borrow()
}

/// Resolves once the cancel flag is raised. Never resolves if the sender is
/// dropped without raising it.
pub async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
#[path = "tests/retry_tests.rs"]
mod tests;
