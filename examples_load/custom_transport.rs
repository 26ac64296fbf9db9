use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use tracing_log_relay::batch::Batch;
use tracing_log_relay::init::{init_tracing_with_transport, LayerConfig};
use tracing_log_relay::{BatchTransport, ClientConfig, TransportError};

/// Delivers batches somewhere other than the HTTP daemon by implementing
/// `BatchTransport` directly. This one just prints the JSON body.
struct StdoutTransport;

#[async_trait]
impl BatchTransport for StdoutTransport {
    async fn send(&self, batch: &Batch) -> Result<(), TransportError> {
        let body = serde_json::to_string(&batch.payload())?;
        println!("[stdout-transport] {}", body);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (_client, _guard) = init_tracing_with_transport(
        ClientConfig::new("custom-transport-demo"),
        Arc::new(StdoutTransport),
        LayerConfig::default(),
    )?;

    info!("custom transport example started");
    error!(db = "my-custom-db", "simulated error sent via custom transport");

    // `_guard` flushes both records on the way out
    Ok(())
}
