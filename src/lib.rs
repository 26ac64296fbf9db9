//! Non-blocking log client: records are queued in memory, batched by a
//! background thread and posted to a local collector daemon, with retry,
//! circuit breaking and a bounded flush on shutdown.

pub mod record;
pub mod queue;
pub mod batch;
pub mod transport;
pub mod noop_transport;
pub mod retry;
pub mod circuit;
pub mod dispatch;
pub mod scheduler;
pub mod shutdown;
pub mod status;
pub mod config;
pub mod error;
pub mod client;
pub mod layer;
pub mod init;

pub use client::LogClient;
pub use config::{ClientConfig, ConfigOverrides};
pub use error::{ClientError, ConfigError, InitError, TransportError};
pub use record::{Level, LogEntry, LogRecord};
pub use shutdown::{ShutdownGuard, ShutdownReport};
pub use status::PipelineStatus;
pub use transport::BatchTransport;
