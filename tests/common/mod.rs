#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing_log_relay::batch::Batch;
use tracing_log_relay::{BatchTransport, LogRecord, TransportError};

/// Keeps every batch it is handed and answers with a fixed result.
#[derive(Default)]
pub struct RecordingTransport {
    batches: Mutex<Vec<Vec<LogRecord>>>,
    calls: AtomicUsize,
    fail_with: Option<u16>,
    refuse_connections: bool,
}

impl RecordingTransport {
    /// Every call fails the way an unreachable collector does.
    pub fn unreachable() -> Self {
        Self {
            refuse_connections: true,
            ..Self::default()
        }
    }

    /// Every call is answered with `status`.
    pub fn failing_with(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<LogRecord>> {
        self.batches.lock().clone()
    }

    pub fn messages(&self) -> Vec<Vec<String>> {
        self.batches
            .lock()
            .iter()
            .map(|b| b.iter().map(|r| r.message.clone()).collect())
            .collect()
    }

    pub fn total_records(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl BatchTransport for RecordingTransport {
    async fn send(&self, batch: &Batch) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse_connections {
            return Err(TransportError::Connection("connection refused".into()));
        }
        if let Some(status) = self.fail_with {
            return Err(TransportError::Status { status });
        }
        self.batches.lock().push(batch.records().to_vec());
        Ok(())
    }
}

/// Never answers; only the per-attempt timeout gets it unstuck.
pub struct HangingTransport;

#[async_trait]
impl BatchTransport for HangingTransport {
    async fn send(&self, _batch: &Batch) -> Result<(), TransportError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Takes `delay` to accept each batch.
pub struct SlowTransport {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowTransport {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchTransport for SlowTransport {
    async fn send(&self, _batch: &Batch) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Poll `cond` until it holds or `within` elapses.
pub fn wait_until(within: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
