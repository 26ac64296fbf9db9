use crate::circuit::CircuitBreaker;
use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::error::ClientError;
use crate::queue::BoundedQueue;
use crate::record::{Level, LogEntry};
use crate::retry::{RetryPolicy, RetryingTransport};
use crate::scheduler::Scheduler;
use crate::shutdown::{Running, ShutdownGuard};
use crate::status::{PipelineStats, PipelineStatus};
use crate::transport::BatchTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use tokio::sync::{oneshot, Notify};
use tracing::{info, warn};

/// Name of the per-client background thread.
pub const FLUSH_THREAD_NAME: &str = "log-relay-flush";

/// Producer-side handle to the delivery pipeline.
///
/// Cheap to clone and safe to share between threads. Recording never
/// blocks on the network and never fails; delivery problems only show up
/// in [`LogClient::status`]. A disabled client accepts and discards
/// everything.
#[derive(Clone)]
pub struct LogClient {
    inner: Option<Arc<Shared>>,
}

struct Shared {
    application_id: Arc<str>,
    service_name: Option<Arc<str>>,
    min_level: Level,
    batch_size: usize,
    queue: Arc<BoundedQueue>,
    wake: Arc<Notify>,
    accepting: Arc<AtomicBool>,
    stats: Arc<PipelineStats>,
}

impl LogClient {
    /// Start a client that posts batches to the configured daemon over HTTP.
    #[cfg(feature = "http")]
    pub fn start(config: ClientConfig) -> Result<(Self, ShutdownGuard), ClientError> {
        if !config.enabled {
            return Ok(Self::disabled_pair());
        }
        let config = config.validate()?;
        let transport = crate::transport::HttpTransport::from_config(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Resolve configuration from the environment and stored config file,
    /// then [`start`](Self::start).
    #[cfg(feature = "http")]
    pub fn from_env() -> Result<(Self, ShutdownGuard), ClientError> {
        Self::start(ClientConfig::from_env()?)
    }

    /// Start a client that hands batches to `transport`.
    ///
    /// Validates `config`, then spawns the background thread that owns the
    /// flush loop. The returned guard must be kept alive for as long as
    /// records should be delivered.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn BatchTransport>,
    ) -> Result<(Self, ShutdownGuard), ClientError> {
        if !config.enabled {
            return Ok(Self::disabled_pair());
        }
        let config = config.validate()?;

        let application_id: Arc<str> = Arc::from(config.application_id.as_str());
        let queue = Arc::new(BoundedQueue::new(config.max_buffer_size));
        let wake = Arc::new(Notify::new());
        let accepting = Arc::new(AtomicBool::new(true));

        let breaker = CircuitBreaker::new(config.circuit_reset_interval);
        let stats = Arc::new(PipelineStats::with_circuit(breaker.status_cell()));
        let retrying = RetryingTransport::new(
            transport,
            RetryPolicy {
                max_retries: config.max_retries,
                base_backoff: config.retry_backoff,
                attempt_timeout: config.http_timeout,
            },
        );
        let (signal_tx, signal_rx) = oneshot::channel();
        let scheduler = Scheduler::new(
            Arc::clone(&queue),
            Arc::clone(&application_id),
            config.batch_size,
            config.flush_interval,
            Arc::clone(&wake),
            Dispatcher::new(retrying, breaker, Arc::clone(&stats)),
            signal_rx,
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ClientError::Spawn)?;
        let (done_tx, done_rx) = mpsc::channel();

        let thread = std::thread::Builder::new()
            .name(FLUSH_THREAD_NAME.to_string())
            .spawn(move || {
                let summary = runtime.block_on(scheduler.run());
                let _ = done_tx.send(summary);
                // don't wait on leftover connection or resolver tasks
                runtime.shutdown_background();
            })
            .map_err(ClientError::Spawn)?;

        info!(
            application_id = %application_id,
            batch_size = config.batch_size,
            flush_interval = ?config.flush_interval,
            max_buffer_size = config.max_buffer_size,
            "log client started"
        );

        let guard = ShutdownGuard::new(Running {
            signal: signal_tx,
            done: done_rx,
            thread,
            accepting: Arc::clone(&accepting),
            budget: config.shutdown_timeout,
        });
        let client = Self {
            inner: Some(Arc::new(Shared {
                application_id,
                service_name: config.service_name.as_deref().map(Arc::from),
                min_level: config.min_level,
                batch_size: config.batch_size,
                queue,
                wake,
                accepting,
                stats,
            })),
        };
        Ok((client, guard))
    }

    /// A client that drops everything, with nothing running behind it.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    fn disabled_pair() -> (Self, ShutdownGuard) {
        info!("log client disabled by configuration");
        (Self::disabled(), ShutdownGuard::not_running())
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn application_id(&self) -> Option<&str> {
        self.inner.as_deref().map(|s| &*s.application_id)
    }

    /// Queue one entry for delivery.
    ///
    /// Entries below the configured minimum level, or arriving after
    /// shutdown began, are counted and discarded.
    pub fn record(&self, entry: LogEntry) {
        if let Some(shared) = &self.inner {
            shared.record(entry);
        }
    }

    pub fn log(&self, level: Level, module_name: impl Into<String>, message: impl Into<String>) {
        self.record(LogEntry::new(level, message).module(module_name));
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.record(LogEntry::new(Level::Debug, message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(LogEntry::new(Level::Info, message));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.record(LogEntry::new(Level::Warn, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(LogEntry::new(Level::Error, message));
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.record(LogEntry::new(Level::Critical, message));
    }

    /// Ask the flush loop to send what is queued now. Does not wait.
    pub fn flush(&self) {
        if let Some(shared) = &self.inner {
            shared.wake.notify_one();
        }
    }

    pub fn status(&self) -> PipelineStatus {
        match &self.inner {
            Some(shared) => shared.stats.snapshot(shared.queue.len()),
            None => PipelineStats::default().snapshot(0),
        }
    }
}

impl Shared {
    fn record(&self, entry: LogEntry) {
        if entry.level < self.min_level || !self.accepting.load(Ordering::Acquire) {
            PipelineStats::add(&self.stats.filtered, 1);
            return;
        }

        let record = entry.into_record(&self.application_id, self.service_name.as_ref());
        let outcome = self.queue.push(record);
        PipelineStats::add(&self.stats.accepted, 1);

        if outcome.evicted > 0 {
            PipelineStats::add(&self.stats.evicted, outcome.evicted as u64);
            if outcome.eviction_started {
                PipelineStats::add(&self.stats.eviction_events, 1);
                warn!(
                    max_buffer_size = self.queue.max_size(),
                    "log queue full, dropping oldest records"
                );
            }
        }

        if outcome.len >= self.batch_size {
            self.wake.notify_one();
        }
    }
}

impl std::fmt::Debug for LogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogClient")
            .field("application_id", &self.application_id())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
