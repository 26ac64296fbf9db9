mod common;

use common::{wait_until, HangingTransport, RecordingTransport, SlowTransport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_log_relay::scheduler::FlushSummary;
use tracing_log_relay::{ClientConfig, LogClient, ShutdownReport};

fn quiet_config(app: &str) -> ClientConfig {
    // neither trigger fires on its own during a test
    ClientConfig {
        batch_size: 500,
        flush_interval: Duration::from_secs(60),
        ..ClientConfig::new(app)
    }
}

#[test]
fn final_flush_sends_everything_queued_exactly_once() {
    let transport = Arc::new(RecordingTransport::default());
    let (client, guard) = LogClient::with_transport(
        ClientConfig {
            batch_size: 50,
            ..quiet_config("final-flush")
        },
        transport.clone(),
    )
    .unwrap();

    for i in 0..49 {
        client.info(format!("record {i}"));
    }
    assert_eq!(transport.calls(), 0);

    let report = guard.shutdown();
    assert_eq!(
        report,
        ShutdownReport::Completed(FlushSummary {
            batches: 1,
            records: 49,
            delivered: 49,
        })
    );
    assert_eq!(transport.total_records(), 49);

    // no flushes after shutdown, and late records are refused
    client.error("too late");
    client.flush();
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(transport.calls(), 1);

    let status = client.status();
    assert_eq!(status.filtered, 1);
    assert_eq!(status.queued, 0);
}

#[test]
fn final_flush_splits_into_batches() {
    let transport = Arc::new(RecordingTransport::default());
    let (client, guard) = LogClient::with_transport(
        ClientConfig {
            batch_size: 40,
            ..quiet_config("final-split")
        },
        transport.clone(),
    )
    .unwrap();

    // below the size trigger on purpose
    for i in 0..39 {
        client.info(format!("{i}"));
    }
    let report = guard.shutdown();

    assert!(matches!(report, ShutdownReport::Completed(s) if s.records == 39));
    assert_eq!(transport.total_records(), 39);
}

#[test]
fn dropping_the_guard_flushes() {
    let transport = Arc::new(RecordingTransport::default());
    {
        let (client, _guard) = LogClient::with_transport(quiet_config("drop-flush"), transport.clone()).unwrap();
        client.warn("flushed on scope exit");
    }
    assert_eq!(transport.messages(), vec![vec!["flushed on scope exit"]]);
}

#[test]
fn panic_unwind_still_flushes() {
    let transport = Arc::new(RecordingTransport::default());
    let inner = transport.clone();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
        let (client, _guard) = LogClient::with_transport(quiet_config("panic-flush"), inner).unwrap();
        client.critical("about to fall over");
        panic!("boom");
    }));

    assert!(result.is_err());
    assert_eq!(transport.messages(), vec![vec!["about to fall over"]]);
}

#[test]
fn shutdown_wait_is_bounded_by_timeout() {
    let budget = Duration::from_millis(300);
    let (client, guard) = LogClient::with_transport(
        ClientConfig {
            http_timeout: Duration::from_secs(30),
            shutdown_timeout: budget,
            ..quiet_config("bounded-shutdown")
        },
        Arc::new(HangingTransport),
    )
    .unwrap();

    client.error("stuck forever");

    let started = Instant::now();
    let report = guard.shutdown();
    let waited = started.elapsed();

    assert_eq!(report, ShutdownReport::TimedOut);
    assert!(waited >= budget - Duration::from_millis(50), "returned too early: {waited:?}");
    assert!(waited < budget + Duration::from_secs(1), "waited too long: {waited:?}");
}

#[test]
fn in_flight_batch_finishes_within_budget() {
    let transport = Arc::new(RecordingTransport::unreachable());
    let (client, guard) = LogClient::with_transport(
        ClientConfig {
            batch_size: 1,
            max_retries: 2,
            retry_backoff: Duration::from_millis(100),
            ..quiet_config("in-flight")
        },
        transport.clone(),
    )
    .unwrap();

    client.error("retrying");
    assert!(wait_until(Duration::from_secs(2), || transport.calls() >= 1));

    // the retry loop fits in the budget, then the final flush finds an empty queue
    let report = guard.shutdown();
    assert_eq!(report, ShutdownReport::Completed(FlushSummary::default()));
    assert_eq!(transport.calls(), 3);
    assert_eq!(client.status().batches_failed, 1);
}

#[test]
fn no_sends_after_shutdown_returns() {
    let budget = Duration::from_millis(200);
    let transport = Arc::new(SlowTransport::new(Duration::from_millis(300)));
    let (client, guard) = LogClient::with_transport(
        ClientConfig {
            batch_size: 1,
            shutdown_timeout: budget,
            ..quiet_config("slow-cycle")
        },
        transport.clone(),
    )
    .unwrap();

    for i in 0..10 {
        client.info(format!("record {i}"));
    }
    assert!(wait_until(Duration::from_secs(2), || transport.calls() >= 1));

    let started = Instant::now();
    let report = guard.shutdown();
    let waited = started.elapsed();
    let calls_at_return = transport.calls();

    assert_eq!(report, ShutdownReport::TimedOut);
    assert_eq!(calls_at_return, 1);
    assert!(waited < budget + Duration::from_secs(1), "waited too long: {waited:?}");

    // the cycle that was running must not keep going in the background
    std::thread::sleep(Duration::from_secs(1));
    assert_eq!(transport.calls(), calls_at_return);
    assert!(client.status().queued > 0);
}

#[test]
fn disabled_client_has_nothing_to_stop() {
    let (client, guard) = LogClient::with_transport(
        ClientConfig {
            enabled: false,
            ..ClientConfig::default()
        },
        Arc::new(RecordingTransport::default()),
    )
    .unwrap();

    client.error("dropped");
    assert!(!guard.is_running());
    assert_eq!(guard.shutdown(), ShutdownReport::NotRunning);
}
