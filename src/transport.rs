use crate::batch::Batch;
use crate::error::TransportError;
use async_trait::async_trait;

/// Destination for [`Batch`]es produced by the flush loop.
///
/// Implementations perform exactly one delivery attempt per call; retries,
/// timeouts and circuit breaking are layered on top by the client. `send` is
/// only ever called from the client's background thread, never from a
/// producer.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// Deliver one batch.
    ///
    /// **Returns**
    /// - `Ok(())` if the collector accepted the whole batch.
    /// - `Err(..)` otherwise. [`TransportError::is_retryable`] decides
    ///   whether the client tries again.
    async fn send(&self, batch: &Batch) -> Result<(), TransportError>;
}

#[cfg(feature = "http")]
pub use self::http::{HttpTransport, INGEST_PATH};

#[cfg(feature = "http")]
mod http {
    use super::BatchTransport;
    use crate::batch::Batch;
    use crate::config::ClientConfig;
    use crate::error::{ClientError, TransportError};
    use async_trait::async_trait;
    use reqwest::header::{HeaderValue, CONTENT_TYPE};
    use reqwest::Client;
    use std::time::Duration;
    use url::Url;

    /// Path of the collector's ingest endpoint, relative to the daemon URL.
    pub const INGEST_PATH: &str = "/logs/ingest";

    /// Posts each batch as one JSON document to the collector.
    #[derive(Clone, Debug)]
    pub struct HttpTransport {
        client: Client,
        endpoint: Url,
        timeout: Duration,
    }

    impl HttpTransport {
        pub fn new(daemon_url: &str, timeout: Duration) -> Result<Self, ClientError> {
            let endpoint = ingest_url(daemon_url)?;
            let client = Client::builder()
                .timeout(timeout)
                .user_agent(concat!("tracing-log-relay/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| ClientError::Transport(e.to_string()))?;

            Ok(Self {
                client,
                endpoint,
                timeout,
            })
        }

        pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
            Self::new(&config.daemon_url, config.http_timeout)
        }

        pub fn endpoint(&self) -> &Url {
            &self.endpoint
        }
    }

    /// Append [`INGEST_PATH`] unless the url already ends with it.
    fn ingest_url(daemon_url: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(daemon_url)
            .map_err(|e| ClientError::Transport(format!("invalid daemon url {daemon_url:?}: {e}")))?;

        let path = url.path().trim_end_matches('/').to_string();
        if !path.ends_with(INGEST_PATH) {
            url.set_path(&format!("{path}{INGEST_PATH}"));
        }
        Ok(url)
    }

    #[async_trait]
    impl BatchTransport for HttpTransport {
        async fn send(&self, batch: &Batch) -> Result<(), TransportError> {
            let body = serde_json::to_vec(&batch.payload())?;

            let resp = self
                .client
                .post(self.endpoint.clone())
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        TransportError::Timeout(self.timeout)
                    } else {
                        TransportError::Connection(e.to_string())
                    }
                })?;

            let status = resp.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(TransportError::Status {
                    status: status.as_u16(),
                })
            }
        }
    }

}
