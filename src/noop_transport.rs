use crate::batch::Batch;
use crate::error::TransportError;
use crate::transport::BatchTransport;
use async_trait::async_trait;

/// A transport that accepts and discards every batch.
///
/// Useful for measuring the overhead of the client itself without any
/// network I/O, and for tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopTransport;

#[async_trait]
impl BatchTransport for NoopTransport {
    async fn send(&self, _batch: &Batch) -> Result<(), TransportError> {
        Ok(())
    }
}
