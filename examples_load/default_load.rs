use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use tracing_log_relay::init::{init_tracing_with_transport, LayerConfig};
use tracing_log_relay::noop_transport::NoopTransport;
use tracing_log_relay::ClientConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (client, guard) = init_tracing_with_transport(
        ClientConfig::new("default-load"),
        Arc::new(NoopTransport),
        LayerConfig {
            enable_stdout: false,
        },
    )?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: recorded {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let report = guard.shutdown();
    println!("shutdown: {:?}", report);
    println!("status: {}", serde_json::to_string_pretty(&client.status())?);
    Ok(())
}
