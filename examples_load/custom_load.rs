use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::error;

use tracing_log_relay::init::{init_tracing_with_transport, LayerConfig};
use tracing_log_relay::noop_transport::NoopTransport;
use tracing_log_relay::{ClientConfig, Level};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig {
        min_level: Level::Error,
        max_buffer_size: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        ..ClientConfig::new("custom-load")
    };

    let (client, guard) = init_tracing_with_transport(
        config,
        Arc::new(NoopTransport),
        LayerConfig {
            enable_stdout: false,
        },
    )?;

    let threads: u64 = 4;
    let per_thread: u64 = 25_000;
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            std::thread::spawn(move || {
                for i in 0..per_thread {
                    error!(thread = t, iteration = i, "custom load test error");
                }
            })
        })
        .collect();
    for h in handles {
        let _ = h.join();
    }

    let n = threads * per_thread;
    let elapsed = start.elapsed();
    println!("custom config: recorded {} events from {} threads in {:?} (~{:.0} ev/s)",
        n,
        threads,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let report = guard.shutdown();
    println!("shutdown: {:?}", report);
    println!("status: {}", serde_json::to_string_pretty(&client.status())?);
    Ok(())
}
