use crate::record::LogRecord;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default capacity of the in-memory queue.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 10_000;

/// Result of a single [`BoundedQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    /// Queue length after the push (and any eviction).
    pub len: usize,
    /// Records evicted to make room for this one.
    pub evicted: usize,
    /// `true` when this push started a new eviction event.
    pub eviction_started: bool,
}

/// FIFO holding area shared between producers and the flush loop.
///
/// When full, the oldest records are dropped. Consecutive evictions between
/// two drains form one eviction event, which callers report once.
#[derive(Debug)]
pub struct BoundedQueue {
    inner: Mutex<QueueInner>,
    max_size: usize,
}

#[derive(Debug, Default)]
struct QueueInner {
    records: VecDeque<LogRecord>,
    evicting: bool,
}

impl BoundedQueue {
    /// `max_size == 0` means unbounded.
    pub fn new(max_size: usize) -> Self {
        let initial = if max_size == 0 { 0 } else { max_size.min(1024) };
        Self {
            inner: Mutex::new(QueueInner {
                records: VecDeque::with_capacity(initial),
                evicting: false,
            }),
            max_size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append to the tail, evicting from the head while over capacity.
    pub fn push(&self, record: LogRecord) -> PushOutcome {
        let mut inner = self.inner.lock();
        inner.records.push_back(record);

        let mut evicted = 0;
        if self.max_size > 0 {
            while inner.records.len() > self.max_size {
                inner.records.pop_front();
                evicted += 1;
            }
        }

        let eviction_started = evicted > 0 && !inner.evicting;
        if evicted > 0 {
            inner.evicting = true;
        }

        PushOutcome {
            len: inner.records.len(),
            evicted,
            eviction_started,
        }
    }

    /// Remove and return up to `max` records from the head, oldest first.
    pub fn drain(&self, max: usize) -> Vec<LogRecord> {
        let mut inner = self.inner.lock();
        if inner.records.is_empty() || max == 0 {
            return Vec::new();
        }

        let take = max.min(inner.records.len());
        let drained: Vec<LogRecord> = inner.records.drain(..take).collect();
        inner.evicting = false;
        drained
    }
}
