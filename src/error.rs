use std::time::Duration;

/// Problems resolving a [`ClientConfig`](crate::config::ClientConfig).
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("application id is required (set it explicitly, via LOG_RELAY_APPLICATION_ID, or in the stored config)")]
    MissingApplicationId,

    #[error("invalid daemon url {url:?}: {reason}")]
    InvalidDaemonUrl { url: String, reason: String },

    #[error("failed to read stored config {path}: {source}")]
    StoredConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stored config: {0}")]
    StoredConfigParse(#[from] serde_json::Error),
}

/// Failure of a single delivery attempt.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("collector responded with HTTP {status}")]
    Status { status: u16 },

    #[error("failed to serialize batch: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TransportError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// 4xx responses mean the request itself was refused, except for
    /// 408 (request timeout) and 429 (too many requests).
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout(_) | TransportError::Connection(_) => true,
            TransportError::Status { status } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
            TransportError::Serialization(_) => false,
        }
    }
}

/// Errors surfaced while constructing a client. Never returned to producers.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build transport: {0}")]
    Transport(String),

    #[error("failed to start background flush thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors from the process-wide `tracing` initialisation helpers.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet(#[from] tracing::subscriber::SetGlobalDefaultError),
}
