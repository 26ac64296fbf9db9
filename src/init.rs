use crate::client::LogClient;
use crate::config::ClientConfig;
use crate::error::InitError;
use crate::layer::RelayLayer;
use crate::shutdown::ShutdownGuard;
use crate::transport::BatchTransport;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer as _;
use tracing_subscriber::{EnvFilter, Registry};

/// How the global subscriber is assembled around the [`RelayLayer`].
///
/// **Fields**
/// - `enable_stdout`: also print events to the console through a
///   `tracing_subscriber::fmt` layer, filtered by `RUST_LOG`.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            enable_stdout: true,
        }
    }
}

/// Start an HTTP client for `config` and install it as the global
/// `tracing` subscriber.
///
/// **Returns**
///
/// The client, for direct use, and the guard that flushes it on drop. Keep
/// the guard in `main` so queued records are sent on exit.
#[cfg(feature = "http")]
pub fn init_tracing(
    config: ClientConfig,
    layer_config: LayerConfig,
) -> Result<(LogClient, ShutdownGuard), InitError> {
    let (client, guard) = LogClient::start(config)?;
    install(&client, layer_config)?;
    Ok((client, guard))
}

/// Same as [`init_tracing`], delivering through a caller-provided transport.
pub fn init_tracing_with_transport(
    config: ClientConfig,
    transport: Arc<dyn BatchTransport>,
    layer_config: LayerConfig,
) -> Result<(LogClient, ShutdownGuard), InitError> {
    let (client, guard) = LogClient::with_transport(config, transport)?;
    install(&client, layer_config)?;
    Ok((client, guard))
}

fn install(client: &LogClient, layer_config: LayerConfig) -> Result<(), InitError> {
    let relay = RelayLayer::new(client.clone());

    // Two subscriber shapes, one per stdout setting, to keep the types apart.
    if layer_config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
        let subscriber = Registry::default().with(relay).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(relay);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}
