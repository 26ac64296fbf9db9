use crate::batch::Batch;
use crate::circuit::{Admission, CircuitBreaker};
use crate::retry::{AttemptOutcome, RetryingTransport};
use crate::status::PipelineStats;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

/// What happened to a batch handed to the [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Rejected { attempts: u32 },
    Failed { attempts: u32 },
    /// Dropped by an open circuit, no network attempt made.
    ShortCircuited,
}

/// Circuit breaker in front of a retrying transport.
///
/// Every batch goes through here exactly once and is never re-queued,
/// whatever the outcome.
pub struct Dispatcher {
    transport: RetryingTransport,
    breaker: CircuitBreaker,
    stats: Arc<PipelineStats>,
}

impl Dispatcher {
    pub fn new(transport: RetryingTransport, breaker: CircuitBreaker, stats: Arc<PipelineStats>) -> Self {
        Self {
            transport,
            breaker,
            stats,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn dispatch(&mut self, batch: Batch) -> DeliveryOutcome {
        let records = batch.len() as u64;

        // tokio's clock so paused-time tests drive the breaker too
        let admission = self.breaker.admit_at(Instant::now().into_std());
        let outcome = match admission {
            Admission::Rejected => {
                debug!(records, "circuit open, dropping batch");
                PipelineStats::add(&self.stats.batches_short_circuited, 1);
                PipelineStats::add(&self.stats.records_dropped, records);
                return DeliveryOutcome::ShortCircuited;
            }
            Admission::Normal => self.transport.deliver(&batch).await,
            Admission::Probe => {
                debug!(records, "circuit half-open, sending probe batch");
                self.transport.deliver_once(&batch).await
            }
        };

        PipelineStats::add(&self.stats.send_attempts, u64::from(outcome.attempts()));
        match outcome {
            AttemptOutcome::Delivered { attempts } => {
                self.breaker.record_success();
                PipelineStats::add(&self.stats.batches_delivered, 1);
                PipelineStats::add(&self.stats.records_delivered, records);
                DeliveryOutcome::Delivered { attempts }
            }
            AttemptOutcome::Rejected { attempts } => {
                // the collector answered, so it is reachable
                self.breaker.record_success();
                PipelineStats::add(&self.stats.batches_rejected, 1);
                PipelineStats::add(&self.stats.records_dropped, records);
                DeliveryOutcome::Rejected { attempts }
            }
            AttemptOutcome::Exhausted { attempts } => {
                self.breaker.record_failure_at(Instant::now().into_std());
                PipelineStats::add(&self.stats.batches_failed, 1);
                PipelineStats::add(&self.stats.records_dropped, records);
                DeliveryOutcome::Failed { attempts }
            }
        }
    }
}
