use crate::scheduler::FlushSummary;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// Slack on top of the flush budget for the background thread to report back.
const REPORT_GRACE: Duration = Duration::from_millis(50);

/// How a [`ShutdownGuard`] release went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReport {
    /// The final flush ran to completion within the budget.
    Completed(FlushSummary),
    /// The budget ran out; whatever was still queued or in flight is lost.
    TimedOut,
    /// Nothing to stop: disabled client, or already released.
    NotRunning,
}

/// Keeps a client's background flush thread alive.
///
/// Releasing the guard, explicitly through [`ShutdownGuard::shutdown`] or by
/// dropping it, stops accepting new records, runs one last flush bounded by
/// the configured shutdown timeout and waits at most that long for it.
/// Dropping during a panic unwind does the same.
///
/// Release blocks the calling thread for up to the shutdown timeout plus a
/// short grace period. On a tokio worker thread that stalls every task
/// scheduled on that worker for as long, so inside async code move the
/// guard into `tokio::task::spawn_blocking` or release it after the runtime
/// has stopped.
#[must_use = "dropping the guard shuts the client down immediately"]
pub struct ShutdownGuard {
    running: Option<Running>,
}

pub(crate) struct Running {
    pub(crate) signal: oneshot::Sender<tokio::time::Instant>,
    pub(crate) done: Receiver<Option<FlushSummary>>,
    pub(crate) thread: JoinHandle<()>,
    pub(crate) accepting: Arc<AtomicBool>,
    pub(crate) budget: Duration,
}

impl ShutdownGuard {
    pub(crate) fn new(running: Running) -> Self {
        Self {
            running: Some(running),
        }
    }

    /// Guard for a client with no background work.
    pub fn not_running() -> Self {
        Self { running: None }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Flush and stop, blocking the calling thread for at most the shutdown
    /// budget plus a short grace period. Avoid calling this directly on an
    /// async runtime worker; see [`ShutdownGuard`].
    pub fn shutdown(mut self) -> ShutdownReport {
        self.release()
    }

    fn release(&mut self) -> ShutdownReport {
        let Some(running) = self.running.take() else {
            return ShutdownReport::NotRunning;
        };
        running.accepting.store(false, Ordering::Release);

        // std clock: the caller may sit inside a paused tokio runtime
        let deadline = tokio::time::Instant::from_std(Instant::now() + running.budget);
        if running.signal.send(deadline).is_err() {
            error!("flush thread exited before shutdown");
            let _ = running.thread.join();
            return ShutdownReport::NotRunning;
        }

        match running.done.recv_timeout(running.budget + REPORT_GRACE) {
            Ok(Some(summary)) => {
                let _ = running.thread.join();
                debug!(?summary, "log client shut down");
                ShutdownReport::Completed(summary)
            }
            Ok(None) => {
                let _ = running.thread.join();
                ShutdownReport::TimedOut
            }
            Err(RecvTimeoutError::Timeout) => {
                // only a transport blocking the thread itself gets here
                warn!(budget = ?running.budget, "flush thread did not stop in time");
                ShutdownReport::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!("flush thread stopped without reporting");
                let _ = running.thread.join();
                ShutdownReport::NotRunning
            }
        }
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ShutdownGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownGuard")
            .field("running", &self.running.is_some())
            .finish()
    }
}
