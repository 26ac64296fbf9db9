use crate::batch::Batch;
use crate::dispatch::{DeliveryOutcome, Dispatcher};
use crate::queue::BoundedQueue;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

/// Counts from one flush cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlushSummary {
    /// Batches handed to the dispatcher.
    pub batches: usize,
    /// Records in those batches.
    pub records: usize,
    /// Records the collector accepted.
    pub delivered: usize,
}

impl FlushSummary {
    fn add(&mut self, records: usize, outcome: DeliveryOutcome) {
        self.batches += 1;
        self.records += records;
        if matches!(outcome, DeliveryOutcome::Delivered { .. }) {
            self.delivered += records;
        }
    }
}

/// Background flush loop: drains the queue on a size or time trigger and
/// hands each batch to the dispatcher.
///
/// Shutdown is noticed both between cycles and while a batch is in flight.
/// Once the deadline is known, nothing is sent past it.
pub(crate) struct Scheduler {
    queue: Arc<BoundedQueue>,
    application_id: Arc<str>,
    batch_size: usize,
    flush_interval: Duration,
    wake: Arc<Notify>,
    dispatcher: Dispatcher,
    shutdown: oneshot::Receiver<Instant>,
    deadline: Option<Instant>,
    /// A batch was cut off or left unsent by the deadline.
    expired: bool,
}

impl Scheduler {
    pub(crate) fn new(
        queue: Arc<BoundedQueue>,
        application_id: Arc<str>,
        batch_size: usize,
        flush_interval: Duration,
        wake: Arc<Notify>,
        dispatcher: Dispatcher,
        shutdown: oneshot::Receiver<Instant>,
    ) -> Self {
        Self {
            queue,
            application_id,
            batch_size: batch_size.max(1),
            flush_interval,
            wake,
            dispatcher,
            shutdown,
            deadline: None,
            expired: false,
        }
    }

    /// Run until the shutdown signal delivers a deadline, then do one final
    /// flush bounded by it.
    ///
    /// Returns `None` if the deadline cut the final flush short.
    pub(crate) async fn run(mut self) -> Option<FlushSummary> {
        debug!(
            batch_size = self.batch_size,
            flush_interval = ?self.flush_interval,
            "flush loop started"
        );
        let mut next_flush = Instant::now() + self.flush_interval;

        while self.deadline.is_none() {
            tokio::select! {
                biased;
                signal = &mut self.shutdown => {
                    // a vanished guard leaves no budget to spend
                    self.deadline = Some(signal.unwrap_or_else(|_| Instant::now()));
                    break;
                }
                _ = self.wake.notified() => {}
                _ = sleep_until(next_flush) => {}
            }

            self.flush_cycle().await;
            next_flush = Instant::now() + self.flush_interval;
        }

        let summary = self.flush_all().await;
        if self.expired {
            warn!(
                remaining = self.queue.len(),
                "final flush did not finish before the shutdown deadline"
            );
            return None;
        }
        info!(
            batches = summary.batches,
            records = summary.records,
            delivered = summary.delivered,
            "final flush complete"
        );
        Some(summary)
    }

    /// Send what was queued when the cycle began, in `batch_size` chunks.
    ///
    /// Records pushed while the cycle runs wait for the next trigger, so a
    /// fast producer cannot keep the loop busy forever. A shutdown signal
    /// ends the cycle early; the final flush picks up the rest.
    pub(crate) async fn flush_cycle(&mut self) -> FlushSummary {
        let pending = self.queue.len();
        let rounds = (pending + self.batch_size - 1) / self.batch_size;

        let mut summary = FlushSummary::default();
        for _ in 0..rounds {
            if self.deadline.is_some() {
                break;
            }
            let Some(batch) = Batch::drain_from(&self.queue, &self.application_id, self.batch_size) else {
                break;
            };
            self.send(batch, &mut summary).await;
        }

        if summary.batches > 0 {
            debug!(
                batches = summary.batches,
                records = summary.records,
                delivered = summary.delivered,
                "flush cycle done"
            );
        }
        summary
    }

    /// Drain until the queue is empty or the deadline passes. Only used for
    /// the final flush, when producers are no longer accepted.
    async fn flush_all(&mut self) -> FlushSummary {
        let mut summary = FlushSummary::default();
        while !self.expired {
            let Some(batch) = Batch::drain_from(&self.queue, &self.application_id, self.batch_size) else {
                break;
            };
            self.send(batch, &mut summary).await;
        }
        summary
    }

    /// Dispatch one batch. A shutdown signal arriving meanwhile does not
    /// abandon it, but from then on it only has until the deadline.
    async fn send(&mut self, batch: Batch, summary: &mut FlushSummary) {
        let records = batch.len();
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.expired = true;
                warn!(records, "shutdown deadline passed, batch not sent");
                return;
            }
        }

        let dispatch = self.dispatcher.dispatch(batch);
        tokio::pin!(dispatch);

        let deadline = match self.deadline {
            Some(deadline) => deadline,
            None => tokio::select! {
                outcome = &mut dispatch => {
                    summary.add(records, outcome);
                    return;
                }
                signal = &mut self.shutdown => {
                    let deadline = signal.unwrap_or_else(|_| Instant::now());
                    self.deadline = Some(deadline);
                    deadline
                }
            },
        };

        match timeout_at(deadline, &mut dispatch).await {
            Ok(outcome) => summary.add(records, outcome),
            Err(_) => {
                self.expired = true;
                warn!(records, "shutdown deadline reached mid-send, batch dropped");
            }
        }
    }
}
