use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub enum Attempt<E> {
    /// Worth trying again after a delay.
    Retry(E),
    /// Give up immediately.
    Fail(E),
}

/// Bounded exponential backoff: attempt `n` (0-based) waits `base * 2^n` before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max_attempts: 3,
        }
    }
}

impl Backoff {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `op` until it succeeds, fails hard, or runs out of attempts.
    ///
    /// `op` receives the 0-based attempt number. On exhaustion the last
    /// retryable error is returned.
    pub async fn retry<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, Attempt<E>>>,
        E: std::fmt::Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(Attempt::Fail(e)) => return Err(e),
                Err(Attempt::Retry(e)) if attempt + 1 >= attempts => return Err(e),
                Err(Attempt::Retry(e)) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        reason = %e,
                        "retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
