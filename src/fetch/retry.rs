// src/fetch/retry.rs

use std::{fmt::Display, future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{error, warn};

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fixed-delay retry: at most `attempts` tries, `delay` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: MAX_RETRIES,
            delay: RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails with an error `retryable` rejects,
    /// or the attempt budget runs out. The last error is returned.
    pub async fn run<T, E, F, Fut, P>(&self, what: &str, mut op: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < attempts && retryable(&e) => {
                    warn!(
                        op = what,
                        attempt,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %e,
                        "retrying"
                    );
                    sleep(self.delay).await;
                }
                Err(e) => {
                    if retryable(&e) {
                        error!(op = what, attempts = attempt, error = %e, "exhausted retries");
                    }
                    return Err(e);
                }
            }
        }
    }
}
