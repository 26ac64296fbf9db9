use crate::batch::Batch;
use crate::error::TransportError;
use crate::transport::BatchTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// How many times to try a batch and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(100),
            attempt_timeout: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after the failed attempt `attempt` (0-indexed): `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor)
    }
}

/// Final result of handing one batch to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Delivered { attempts: u32 },
    /// The collector refused the batch in a way retrying cannot fix.
    Rejected { attempts: u32 },
    /// Every allowed attempt failed.
    Exhausted { attempts: u32 },
}

impl AttemptOutcome {
    pub fn attempts(&self) -> u32 {
        match *self {
            AttemptOutcome::Delivered { attempts }
            | AttemptOutcome::Rejected { attempts }
            | AttemptOutcome::Exhausted { attempts } => attempts,
        }
    }
}

/// Wraps a [`BatchTransport`] with per-attempt timeouts and exponential backoff.
#[derive(Clone)]
pub struct RetryingTransport {
    inner: Arc<dyn BatchTransport>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn BatchTransport>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Try the batch up to `1 + max_retries` times.
    pub async fn deliver(&self, batch: &Batch) -> AttemptOutcome {
        self.deliver_with_limit(batch, self.policy.max_attempts()).await
    }

    /// One attempt, no retries.
    pub async fn deliver_once(&self, batch: &Batch) -> AttemptOutcome {
        self.deliver_with_limit(batch, 1).await
    }

    async fn deliver_with_limit(&self, batch: &Batch, max_attempts: u32) -> AttemptOutcome {
        let mut attempt = 0;
        loop {
            let result = match timeout(self.policy.attempt_timeout, self.inner.send(batch)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(self.policy.attempt_timeout)),
            };
            attempt += 1;

            let err = match result {
                Ok(()) => return AttemptOutcome::Delivered { attempts: attempt },
                Err(e) => e,
            };

            if !err.is_retryable() {
                warn!(
                    records = batch.len(),
                    error = %err,
                    "collector rejected batch, dropping it"
                );
                return AttemptOutcome::Rejected { attempts: attempt };
            }

            if attempt >= max_attempts {
                warn!(
                    records = batch.len(),
                    attempts = attempt,
                    error = %err,
                    "giving up on batch"
                );
                return AttemptOutcome::Exhausted { attempts: attempt };
            }

            let delay = self.policy.backoff(attempt - 1);
            debug!(attempt, error = %err, ?delay, "send failed, backing off");
            sleep(delay).await;
        }
    }
}
