use crate::circuit::{CircuitStatus, CircuitStatusCell};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by producers and the flush loop.
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Records accepted into the queue.
    pub accepted: AtomicU64,
    /// Below `min_level`, or arrived after shutdown.
    pub filtered: AtomicU64,
    /// Dropped by drop-oldest eviction.
    pub evicted: AtomicU64,
    pub eviction_events: AtomicU64,
    pub send_attempts: AtomicU64,
    pub batches_delivered: AtomicU64,
    pub records_delivered: AtomicU64,
    /// Exhausted every retry.
    pub batches_failed: AtomicU64,
    /// Refused by the collector with a non-retryable status.
    pub batches_rejected: AtomicU64,
    /// Dropped without a network attempt because the circuit was open.
    pub batches_short_circuited: AtomicU64,
    pub records_dropped: AtomicU64,
    pub(crate) circuit: CircuitStatusCell,
}

impl PipelineStats {
    pub(crate) fn with_circuit(circuit: CircuitStatusCell) -> Self {
        Self {
            circuit,
            ..Self::default()
        }
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self, queued: usize) -> PipelineStatus {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        PipelineStatus {
            circuit: self.circuit.get(),
            queued,
            accepted: load(&self.accepted),
            filtered: load(&self.filtered),
            evicted: load(&self.evicted),
            eviction_events: load(&self.eviction_events),
            send_attempts: load(&self.send_attempts),
            batches_delivered: load(&self.batches_delivered),
            records_delivered: load(&self.records_delivered),
            batches_failed: load(&self.batches_failed),
            batches_rejected: load(&self.batches_rejected),
            batches_short_circuited: load(&self.batches_short_circuited),
            records_dropped: load(&self.records_dropped),
        }
    }
}

/// Point-in-time health of a client, for external inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStatus {
    pub circuit: CircuitStatus,
    pub queued: usize,
    pub accepted: u64,
    pub filtered: u64,
    pub evicted: u64,
    pub eviction_events: u64,
    pub send_attempts: u64,
    pub batches_delivered: u64,
    pub records_delivered: u64,
    pub batches_failed: u64,
    pub batches_rejected: u64,
    pub batches_short_circuited: u64,
    pub records_dropped: u64,
}

impl PipelineStatus {
    /// Closed circuit and nothing lost so far.
    pub fn is_healthy(&self) -> bool {
        self.circuit == CircuitStatus::Closed && self.records_dropped == 0 && self.evicted == 0
    }
}
