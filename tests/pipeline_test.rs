mod common;

use common::{wait_until, RecordingTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing_log_relay::circuit::CircuitStatus;
use tracing_log_relay::{ClientConfig, Level, LogClient, LogEntry, ShutdownReport};

const WAIT: Duration = Duration::from_secs(3);

fn config(app: &str) -> ClientConfig {
    ClientConfig {
        batch_size: 50,
        flush_interval: Duration::from_secs(60),
        retry_backoff: Duration::from_millis(5),
        ..ClientConfig::new(app)
    }
}

#[test]
fn size_trigger_sends_one_batch_in_order() {
    let transport = Arc::new(RecordingTransport::default());
    let (client, _guard) = LogClient::with_transport(
        ClientConfig {
            batch_size: 3,
            ..config("size-trigger")
        },
        transport.clone(),
    )
    .unwrap();

    client.info("first");
    client.warn("second");
    client.error("third");

    assert!(wait_until(WAIT, || transport.calls() == 1));
    assert_eq!(transport.messages(), vec![vec!["first", "second", "third"]]);

    let batch = &transport.batches()[0];
    assert!(batch.iter().all(|r| &*r.application_id == "size-trigger"));
    assert_eq!(batch[2].level, Level::Error);
    assert_eq!(client.status().records_delivered, 3);
}

#[test]
fn time_trigger_sends_partial_batch() {
    let transport = Arc::new(RecordingTransport::default());
    let (client, _guard) = LogClient::with_transport(
        ClientConfig {
            flush_interval: Duration::from_millis(150),
            ..config("time-trigger")
        },
        transport.clone(),
    )
    .unwrap();

    client.record(LogEntry::new(Level::Info, "lonely").module("billing").field("order_id", &17));

    assert!(wait_until(WAIT, || transport.calls() == 1));
    let record = &transport.batches()[0][0];
    assert_eq!(record.message, "lonely");
    assert_eq!(record.module_name, "billing");
    assert_eq!(record.context.as_ref().unwrap()["order_id"], 17);
}

#[test]
fn explicit_flush_sends_without_waiting_for_timer() {
    let transport = Arc::new(RecordingTransport::default());
    let (client, _guard) = LogClient::with_transport(config("explicit-flush"), transport.clone()).unwrap();

    client.info("now please");
    client.flush();

    assert!(wait_until(WAIT, || transport.calls() == 1));
    assert_eq!(transport.messages(), vec![vec!["now please"]]);
}

#[test]
fn overflow_keeps_newest_and_counts_one_eviction_event() {
    let transport = Arc::new(RecordingTransport::default());
    let (client, guard) = LogClient::with_transport(
        ClientConfig {
            max_buffer_size: 2,
            ..config("overflow")
        },
        transport.clone(),
    )
    .unwrap();

    client.info("A");
    client.info("B");
    client.info("C");

    let status = client.status();
    assert_eq!(status.queued, 2);
    assert_eq!(status.evicted, 1);
    assert_eq!(status.eviction_events, 1);
    assert!(!status.is_healthy());

    assert!(matches!(guard.shutdown(), ShutdownReport::Completed(_)));
    assert_eq!(transport.messages(), vec![vec!["B", "C"]]);
}

#[test]
fn open_circuit_makes_no_network_calls() {
    let transport = Arc::new(RecordingTransport::unreachable());
    let (client, _guard) = LogClient::with_transport(
        ClientConfig {
            batch_size: 1,
            max_retries: 2,
            circuit_reset_interval: Duration::from_secs(60),
            ..config("breaker")
        },
        transport.clone(),
    )
    .unwrap();

    client.error("collector down");
    assert!(wait_until(WAIT, || client.status().batches_failed == 1));
    assert_eq!(transport.calls(), 3);
    assert_eq!(client.status().circuit, CircuitStatus::Open);

    for i in 0..5 {
        client.error(format!("still down {i}"));
    }
    assert!(wait_until(WAIT, || client.status().batches_short_circuited == 5));

    let status = client.status();
    assert_eq!(transport.calls(), 3);
    assert_eq!(status.records_dropped, 6);
    assert_eq!(status.send_attempts, 3);
}

#[test]
fn permanent_rejection_is_not_retried_and_keeps_circuit_closed() {
    let transport = Arc::new(RecordingTransport::failing_with(400));
    let (client, _guard) = LogClient::with_transport(
        ClientConfig {
            batch_size: 1,
            ..config("rejected")
        },
        transport.clone(),
    )
    .unwrap();

    client.error("malformed");
    assert!(wait_until(WAIT, || client.status().batches_rejected == 1));

    let status = client.status();
    assert_eq!(transport.calls(), 1);
    assert_eq!(status.circuit, CircuitStatus::Closed);
    assert_eq!(status.records_dropped, 1);
}

#[test]
fn producers_on_many_threads_never_block_and_keep_their_order() {
    let transport = Arc::new(RecordingTransport::default());
    let (client, guard) = LogClient::with_transport(
        ClientConfig {
            batch_size: 64,
            max_buffer_size: 0,
            ..config("many-producers")
        },
        transport.clone(),
    )
    .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let client = client.clone();
            std::thread::spawn(move || {
                for i in 0..250 {
                    client.info(format!("{t}:{i}"));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    guard.shutdown();
    assert_eq!(transport.total_records(), 1_000);

    let delivered: Vec<String> = transport.messages().into_iter().flatten().collect();
    for t in 0..4 {
        let seq: Vec<usize> = delivered
            .iter()
            .filter_map(|m| m.strip_prefix(&format!("{t}:")))
            .map(|i| i.parse().unwrap())
            .collect();
        assert_eq!(seq, (0..250).collect::<Vec<_>>());
    }
}
