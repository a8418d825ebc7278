//! Transaction tracker integration tests for rivet-sdk
//!
//! All tests run on a paused clock so poll schedules are deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rivet_primitives::H256;
use rivet_sdk::{
    Config, MockReply, MockTransport, RpcClient, TrackOptions, TrackerConfig, TransactionTracker,
    TxEvent, TxOutcome, TxState, TxStatus,
};
use serde_json::{json, Value};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::{sleep, timeout, Instant};

const RECEIPT: &str = "eth_getTransactionReceipt";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn tx_hash(byte: u8) -> H256 {
    H256::from_bytes([byte; 32])
}

fn receipt_json(hash: &H256, status: &str) -> Value {
    json!({
        "transactionHash": hash.to_hex(),
        "blockHash": format!("0x{}", "77".repeat(32)),
        "blockNumber": "0x1b4",
        "gasUsed": "0x5208",
        "cumulativeGasUsed": "0x5208",
        "status": status,
        "logs": []
    })
}

fn setup() -> (MockTransport, TransactionTracker) {
    init_tracing();
    let mock = MockTransport::new();
    let config = TrackerConfig {
        poll_interval_ms: 100,
        max_poll_interval_ms: 1_000,
        backoff_multiplier: 2.0,
        ..Default::default()
    };
    let tracker = TransactionTracker::new(RpcClient::with_transport(mock.clone()), config);
    (mock, tracker)
}

#[derive(Clone, Default)]
struct Counters {
    mined: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    timed_out: Arc<AtomicUsize>,
}

impl Counters {
    fn attach(&self, tracker: &TransactionTracker, hash: H256) {
        let mined = self.mined.clone();
        tracker.on_mined(hash, move |_| {
            mined.fetch_add(1, Ordering::SeqCst);
        });
        let failed = self.failed.clone();
        tracker.on_failed(hash, move |_| {
            failed.fetch_add(1, Ordering::SeqCst);
        });
        let timed_out = self.timed_out.clone();
        tracker.on_timeout(hash, move |_| {
            timed_out.fetch_add(1, Ordering::SeqCst);
        });
    }

    fn snapshot(&self) -> (usize, usize, usize) {
        (
            self.mined.load(Ordering::SeqCst),
            self.failed.load(Ordering::SeqCst),
            self.timed_out.load(Ordering::SeqCst),
        )
    }
}

// ==================== Outcome Tests ====================

#[tokio::test(start_paused = true)]
async fn test_mined_success_fires_once() {
    let (mock, tracker) = setup();
    let hash = tx_hash(1);
    let key = hash.to_hex();
    mock.push_reply_for(RECEIPT, &key, MockReply::Ok(Value::Null));
    mock.set_reply_for(RECEIPT, &key, MockReply::Ok(receipt_json(&hash, "0x1")));

    let counters = Counters::default();
    counters.attach(&tracker, hash);

    let handle = tracker.track(hash, TrackOptions::default());
    let outcome = handle.wait().await;

    let receipt = match outcome {
        TxOutcome::MinedSuccess(receipt) => receipt,
        other => panic!("expected success, got {:?}", other),
    };
    assert_eq!(receipt.block_number, 436);
    assert_eq!(handle.state(), TxState::MinedSuccess);
    assert_eq!(handle.polls(), 2);
    assert_eq!(counters.snapshot(), (1, 0, 0));
    assert!(!tracker.is_tracking(&hash));
    assert_eq!(tracker.active_count(), 0);
    assert_eq!(tracker.events().listener_count(&hash), 0);

    // Re-tracking a mined hash neither polls nor re-delivers
    let again = tracker.track(hash, TrackOptions::default());
    assert_eq!(again.state(), TxState::MinedSuccess);
    assert!(!tracker.is_tracking(&hash));
    sleep(Duration::from_secs(5)).await;
    assert_eq!(mock.call_count_for(RECEIPT, &key), 2);
    assert_eq!(counters.snapshot(), (1, 0, 0));
}

#[tokio::test(start_paused = true)]
async fn test_three_misses_then_revert() {
    let (mock, tracker) = setup();
    let hash = tx_hash(2);
    let key = hash.to_hex();
    for _ in 0..3 {
        mock.push_reply_for(RECEIPT, &key, MockReply::Ok(Value::Null));
    }
    mock.set_reply_for(RECEIPT, &key, MockReply::Ok(receipt_json(&hash, "0x0")));

    let counters = Counters::default();
    counters.attach(&tracker, hash);
    let started = Instant::now();

    let handle = tracker.track(hash, TrackOptions::default());
    let outcome = handle.wait().await;

    match &outcome {
        TxOutcome::MinedRevert(receipt) => assert_eq!(receipt.status, TxStatus::Failure),
        other => panic!("expected revert, got {:?}", other),
    }
    assert_eq!(handle.state(), TxState::MinedRevert);
    assert_eq!(mock.call_count_for(RECEIPT, &key), 4);
    assert_eq!(counters.snapshot(), (0, 1, 0));
    // 100 + 200 + 400 + 800 with backoff
    assert!(started.elapsed() >= Duration::from_millis(1_500));
}

#[tokio::test(start_paused = true)]
async fn test_two_poll_timeout() {
    let (mock, tracker) = setup();
    let hash = tx_hash(3);
    let counters = Counters::default();
    counters.attach(&tracker, hash);

    let handle = tracker.track(hash, TrackOptions::default().max_polls(2));
    assert_eq!(handle.wait().await, TxOutcome::TimedOut);

    assert_eq!(handle.state(), TxState::TimedOut);
    assert!(handle.receipt().is_none());
    assert_eq!(handle.polls(), 2);
    assert_eq!(mock.call_count(RECEIPT), 2);
    assert_eq!(counters.snapshot(), (0, 0, 1));
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_hash_can_be_tracked_again() {
    let (mock, tracker) = setup();
    let hash = tx_hash(4);
    let key = hash.to_hex();

    let first = tracker.track(hash, TrackOptions::default().max_polls(1));
    assert_eq!(first.wait().await, TxOutcome::TimedOut);

    mock.set_reply_for(RECEIPT, &key, MockReply::Ok(receipt_json(&hash, "0x1")));
    let second = tracker.track(hash, TrackOptions::default());
    assert!(tracker.is_tracking(&hash));
    assert!(matches!(second.wait().await, TxOutcome::MinedSuccess(_)));
}

// ==================== Error Handling Tests ====================

#[tokio::test(start_paused = true)]
async fn test_unknown_transaction_counts_as_absent() {
    let (mock, tracker) = setup();
    let hash = tx_hash(5);
    let key = hash.to_hex();
    mock.push_reply_for(
        RECEIPT,
        &key,
        MockReply::Rpc {
            code: -32000,
            message: "unknown transaction".into(),
        },
    );
    mock.set_reply_for(RECEIPT, &key, MockReply::Ok(receipt_json(&hash, "0x1")));

    let handle = tracker.track(hash, TrackOptions::default());
    assert!(matches!(handle.wait().await, TxOutcome::MinedSuccess(_)));
    assert_eq!(handle.polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_errors_are_retried() {
    let (mock, tracker) = setup();
    let hash = tx_hash(6);
    let key = hash.to_hex();
    mock.push_reply_for(RECEIPT, &key, MockReply::Transport("connection reset".into()));
    mock.push_reply_for(
        RECEIPT,
        &key,
        MockReply::Rpc {
            code: -32603,
            message: "internal error".into(),
        },
    );
    mock.set_reply_for(RECEIPT, &key, MockReply::Ok(receipt_json(&hash, "0x1")));

    let handle = tracker.track(hash, TrackOptions::default());
    assert!(matches!(handle.wait().await, TxOutcome::MinedSuccess(_)));
    assert_eq!(handle.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_receipt_does_not_stall_tracking() {
    let (mock, tracker) = setup();
    let hash = tx_hash(9);
    let key = hash.to_hex();
    mock.push_reply_for(RECEIPT, &key, MockReply::Ok(receipt_json(&hash, "0x2")));
    mock.push_reply_for(RECEIPT, &key, MockReply::Ok(json!({ "status": "0x1" })));
    mock.set_reply_for(RECEIPT, &key, MockReply::Ok(receipt_json(&hash, "0x0")));
    let counters = Counters::default();
    counters.attach(&tracker, hash);

    let handle = tracker.track(hash, TrackOptions::default());
    assert!(matches!(handle.wait().await, TxOutcome::MinedRevert(_)));
    assert_eq!(handle.polls(), 3);
    assert_eq!(counters.snapshot(), (0, 1, 0));
}

#[tokio::test(start_paused = true)]
async fn test_persistent_malformed_receipt_times_out() {
    let (mock, tracker) = setup();
    let hash = tx_hash(10);
    mock.set_reply_for(RECEIPT, &hash.to_hex(), MockReply::Ok(json!("not a receipt")));

    let handle = tracker.track(hash, TrackOptions::default().max_polls(2));
    assert_eq!(handle.wait().await, TxOutcome::TimedOut);
    assert!(!tracker.is_tracking(&hash));
}

// ==================== Concurrency Tests ====================

#[tokio::test(start_paused = true)]
async fn test_slow_hash_does_not_block_others() {
    let (mock, tracker) = setup();
    let slow = tx_hash(7);
    let fast = tx_hash(8);
    mock.set_delay_for(RECEIPT, &slow.to_hex(), Duration::from_secs(60));
    mock.set_reply_for(RECEIPT, &fast.to_hex(), MockReply::Ok(receipt_json(&fast, "0x1")));

    let slow_handle = tracker.track(slow, TrackOptions::default());
    let fast_handle = tracker.track(fast, TrackOptions::default());
    assert_eq!(tracker.active_count(), 2);

    let outcome = timeout(Duration::from_secs(1), fast_handle.wait())
        .await
        .expect("fast hash stalled behind slow one");
    assert!(matches!(outcome, TxOutcome::MinedSuccess(_)));
    assert_eq!(slow_handle.state(), TxState::Pending);
    assert!(tracker.is_tracking(&slow));
}

#[tokio::test(start_paused = true)]
async fn test_many_hashes_each_delivered_once() {
    let (mock, tracker) = setup();
    let mined = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (10..40u8)
        .map(|byte| {
            let hash = tx_hash(byte);
            if byte % 2 == 0 {
                mock.set_reply_for(RECEIPT, &hash.to_hex(), MockReply::Ok(receipt_json(&hash, "0x1")));
            }
            let mined = mined.clone();
            tracker.on_mined(hash, move |_| {
                mined.fetch_add(1, Ordering::SeqCst);
            });
            tracker.track(hash, TrackOptions::default().max_polls(3))
        })
        .collect();

    for handle in &handles {
        handle.wait().await;
    }
    assert_eq!(mined.load(Ordering::SeqCst), 15);
    assert_eq!(tracker.active_count(), 0);
}

// ==================== Cancellation Tests ====================

#[tokio::test(start_paused = true)]
async fn test_cancel_drops_listeners() {
    let (mock, tracker) = setup();
    let hash = tx_hash(41);
    let counters = Counters::default();
    counters.attach(&tracker, hash);
    let mut events = tracker.subscribe();

    let handle = tracker.track(hash, TrackOptions::default());
    sleep(Duration::from_millis(250)).await;
    assert!(tracker.cancel(&hash));
    assert!(!tracker.cancel(&hash));

    // A receipt appearing later is never delivered
    mock.set_reply_for(RECEIPT, &hash.to_hex(), MockReply::Ok(receipt_json(&hash, "0x1")));
    assert_eq!(handle.wait().await, TxOutcome::Cancelled);
    sleep(Duration::from_secs(10)).await;

    assert!(handle.is_cancelled());
    assert_eq!(handle.state(), TxState::Pending);
    assert_eq!(counters.snapshot(), (0, 0, 0));
    assert_eq!(tracker.events().listener_count(&hash), 0);
    assert_eq!(events.try_recv().unwrap(), TxEvent::Cancelled { hash });
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_discards_in_flight_poll() {
    let (mock, tracker) = setup();
    let hash = tx_hash(42);
    let key = hash.to_hex();
    mock.set_delay_for(RECEIPT, &key, Duration::from_millis(500));
    mock.set_reply_for(RECEIPT, &key, MockReply::Ok(receipt_json(&hash, "0x1")));
    let counters = Counters::default();
    counters.attach(&tracker, hash);

    let handle = tracker.track(hash, TrackOptions::default());
    // First poll starts at 100ms and answers at 600ms
    sleep(Duration::from_millis(200)).await;
    assert_eq!(mock.call_count_for(RECEIPT, &key), 1);
    tracker.cancel(&hash);

    assert_eq!(handle.wait().await, TxOutcome::Cancelled);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(counters.snapshot(), (0, 0, 0));
    assert!(handle.receipt().is_none());
    assert!(tracker.events().completed(&hash).is_none());
}

// ==================== Event Bus Tests ====================

#[tokio::test(start_paused = true)]
async fn test_subscribe_streams_lifecycle() {
    let (mock, tracker) = setup();
    let ok = tx_hash(50);
    let lost = tx_hash(51);
    mock.set_reply_for(RECEIPT, &ok.to_hex(), MockReply::Ok(receipt_json(&ok, "0x1")));
    let mut events = tracker.subscribe();

    tracker.track(ok, TrackOptions::default()).wait().await;
    tracker.track(lost, TrackOptions::default().max_polls(1)).wait().await;

    match events.recv().await.unwrap() {
        TxEvent::Mined { hash, receipt } => {
            assert_eq!(hash, ok);
            assert!(receipt.is_success());
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(events.recv().await.unwrap(), TxEvent::TimedOut { hash: lost });
}

#[tokio::test(start_paused = true)]
async fn test_late_listener_on_mined_hash() {
    let (mock, tracker) = setup();
    let hash = tx_hash(52);
    mock.set_reply_for(RECEIPT, &hash.to_hex(), MockReply::Ok(receipt_json(&hash, "0x1")));
    tracker.track(hash, TrackOptions::default()).wait().await;

    let counters = Counters::default();
    counters.attach(&tracker, hash);
    assert_eq!(counters.snapshot(), (1, 0, 0));
    assert_eq!(tracker.events().listener_count(&hash), 0);
}

#[tokio::test(start_paused = true)]
async fn test_trackers_do_not_cross_deliver() {
    let (mock, first) = setup();
    let second = TransactionTracker::new(
        RpcClient::with_transport(mock.clone()),
        first.config().clone(),
    );
    let hash = tx_hash(53);
    mock.set_reply_for(RECEIPT, &hash.to_hex(), MockReply::Ok(receipt_json(&hash, "0x1")));

    let first_counters = Counters::default();
    first_counters.attach(&first, hash);
    let second_counters = Counters::default();
    second_counters.attach(&second, hash);
    let mut second_events = second.subscribe();

    first.track(hash, TrackOptions::default()).wait().await;
    sleep(Duration::from_secs(1)).await;

    assert_eq!(first_counters.snapshot(), (1, 0, 0));
    assert_eq!(second_counters.snapshot(), (0, 0, 0));
    assert_eq!(second.events().listener_count(&hash), 3);
    assert!(matches!(second_events.try_recv(), Err(TryRecvError::Empty)));
}

// ==================== Configuration Tests ====================

#[tokio::test(start_paused = true)]
async fn test_tracker_from_toml() {
    let config = Config::from_toml_str(
        r#"
        [tracker]
        poll_interval_ms = 50
        max_poll_interval_ms = 50
        timeout_ms = 175
        "#,
    )
    .unwrap();
    let mock = MockTransport::new();
    let tracker = TransactionTracker::new(RpcClient::with_transport(mock.clone()), config.tracker);

    let started = Instant::now();
    let outcome = tracker.track(tx_hash(60), TrackOptions::default()).wait().await;
    assert_eq!(outcome, TxOutcome::TimedOut);
    // Polls at 50, 100, 150 and the deadline
    assert_eq!(mock.call_count(RECEIPT), 4);
    assert!(started.elapsed() < Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_extreme_backoff_still_terminates() {
    init_tracing();
    assert!(Config::from_toml_str("[tracker]\nbackoff_multiplier = 1e30").is_err());

    let mock = MockTransport::new();
    let config = TrackerConfig {
        poll_interval_ms: 100,
        max_poll_interval_ms: 1_000,
        backoff_multiplier: f64::INFINITY,
        ..Default::default()
    };
    let tracker = TransactionTracker::new(RpcClient::with_transport(mock.clone()), config);
    let hash = tx_hash(61);
    let counters = Counters::default();
    counters.attach(&tracker, hash);

    let handle = tracker.track(hash, TrackOptions::default().max_polls(3));
    assert_eq!(handle.wait().await, TxOutcome::TimedOut);
    assert_eq!(handle.state(), TxState::TimedOut);
    assert_eq!(handle.polls(), 3);
    assert!(!tracker.is_tracking(&hash));
    assert_eq!(tracker.active_count(), 0);
    assert_eq!(counters.snapshot(), (0, 0, 1));

    // A fresh poll task starts for the same hash
    let again = tracker.track(hash, TrackOptions::default().max_polls(1));
    assert!(tracker.is_tracking(&hash));
    assert_eq!(again.wait().await, TxOutcome::TimedOut);
    assert_eq!(mock.call_count(RECEIPT), 4);
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_timeout_and_interval() {
    let (mock, tracker) = setup();
    let hash = tx_hash(62);

    let opts = TrackOptions::default()
        .timeout(Duration::MAX)
        .max_polls(2);
    assert_eq!(tracker.track(hash, opts).wait().await, TxOutcome::TimedOut);
    assert_eq!(mock.call_count(RECEIPT), 2);

    let wide = TransactionTracker::new(
        RpcClient::with_transport(mock.clone()),
        TrackerConfig {
            poll_interval_ms: 100,
            max_poll_interval_ms: u64::MAX,
            backoff_multiplier: 10.0,
            timeout_ms: Some(5_000),
            ..Default::default()
        },
    );
    let handle = wide.track(tx_hash(63), TrackOptions::default());
    assert_eq!(handle.wait().await, TxOutcome::TimedOut);
    assert!(!wide.is_tracking(&tx_hash(63)));
}
