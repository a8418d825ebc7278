//! Transaction lifecycle tracker
//!
//! [`TransactionTracker::track`] spawns one poll task per hash. Each task
//! asks the node for the receipt, backing off while none exists, until the
//! hash is mined, times out or is cancelled. Terminal transitions are
//! delivered through the tracker's own [`EventBus`].
//!
//! ```rust,no_run
//! use rivet_sdk::{RpcClient, TrackOptions, TrackerConfig, TransactionTracker};
//! use rivet_primitives::H256;
//!
//! # async fn run() {
//! let tracker = TransactionTracker::new(RpcClient::new_mock(), TrackerConfig::default());
//! let hash = H256::from_bytes([0x11; 32]);
//! tracker.on_mined(hash, |receipt| println!("mined in block {}", receipt.block_number));
//! let outcome = tracker.track(hash, TrackOptions::default()).wait().await;
//! # }
//! ```

mod state;

pub use state::{TransactionHandle, TxOutcome, TxState};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rivet_primitives::H256;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::client::RpcClient;
use crate::config::{PollSchedule, TrackOptions, TrackerConfig};
use crate::events::{EventBus, TxEvent};
use crate::types::Receipt;
use state::{Control, Progress};

struct ActiveEntry {
    id: u64,
    handle: TransactionHandle,
}

struct Inner {
    client: RpcClient,
    config: TrackerConfig,
    active: DashMap<H256, ActiveEntry>,
    bus: EventBus,
    next_id: AtomicU64,
}

/// Polls receipts for submitted transactions
///
/// Cheap to clone; clones share the active set and the event bus. Two
/// separately constructed trackers share nothing.
#[derive(Clone)]
pub struct TransactionTracker {
    inner: Arc<Inner>,
}

impl TransactionTracker {
    /// Create a tracker polling through `client`
    ///
    /// Out-of-range settings are clamped when a hash is scheduled.
    pub fn new(client: RpcClient, config: TrackerConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!(error = %e, "tracker config out of range, clamping");
        }
        let bus = EventBus::new(config.event_capacity, config.completed_capacity);
        Self {
            inner: Arc::new(Inner {
                client,
                config,
                active: DashMap::new(),
                bus,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Tracker configuration
    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Event bus owned by this tracker
    pub fn events(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Start tracking `hash`
    ///
    /// Tracking an already tracked hash returns the existing handle. A hash
    /// this tracker has seen mined returns a terminal handle without polling
    /// again. Must be called within a tokio runtime.
    pub fn track(&self, hash: H256, opts: TrackOptions) -> TransactionHandle {
        match self.inner.active.entry(hash) {
            Entry::Occupied(entry) => {
                debug!(%hash, "already tracking");
                entry.get().handle.clone()
            }
            Entry::Vacant(entry) => {
                if let Some(outcome) = self.inner.bus.completed(&hash) {
                    debug!(%hash, "already mined");
                    return TransactionHandle::finished(hash, &outcome);
                }

                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                let (progress_tx, progress_rx) = watch::channel(Progress::pending());
                let control = Arc::new(Control::default());
                let handle = TransactionHandle::new(hash, progress_rx, control.clone());
                entry.insert(ActiveEntry {
                    id,
                    handle: handle.clone(),
                });

                let schedule = self.inner.config.schedule(&opts);
                info!(%hash, interval = ?schedule.interval, max_polls = ?schedule.max_polls, timeout = ?schedule.timeout, "tracking transaction");
                tokio::spawn(poll_loop(
                    self.inner.clone(),
                    hash,
                    id,
                    schedule,
                    progress_tx,
                    control,
                ));
                handle
            }
        }
    }

    /// Stop tracking `hash` without notifying its listeners
    ///
    /// Returns false if the hash was not being tracked. A poll already in
    /// flight completes and its result is discarded.
    pub fn cancel(&self, hash: &H256) -> bool {
        match self.inner.active.remove(hash) {
            Some((_, entry)) => {
                entry.handle.control().cancel();
                self.inner.bus.discard(*hash);
                info!(%hash, "tracking cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel everything currently tracked and drop all listeners
    pub fn shutdown(&self) {
        let hashes: Vec<H256> = self.inner.active.iter().map(|entry| *entry.key()).collect();
        for hash in &hashes {
            self.cancel(hash);
        }
        let dropped = self.inner.bus.clear_listeners();
        info!(cancelled = hashes.len(), dropped_listeners = dropped, "tracker shut down");
    }

    /// Run `callback` once if `hash` is mined with success status
    pub fn on_mined<F>(&self, hash: H256, callback: F)
    where
        F: FnOnce(&Receipt) + Send + 'static,
    {
        self.inner.bus.on_mined(hash, callback);
    }

    /// Run `callback` once if `hash` is mined with failure status
    pub fn on_failed<F>(&self, hash: H256, callback: F)
    where
        F: FnOnce(&Receipt) + Send + 'static,
    {
        self.inner.bus.on_failed(hash, callback);
    }

    /// Run `callback` once if tracking `hash` times out
    pub fn on_timeout<F>(&self, hash: H256, callback: F)
    where
        F: FnOnce(H256) + Send + 'static,
    {
        self.inner.bus.on_timeout(hash, callback);
    }

    /// Drop the listeners registered for `hash` without firing them
    pub fn remove_listeners(&self, hash: &H256) -> usize {
        self.inner.bus.remove_listeners(hash)
    }

    /// Stream of lifecycle events from this tracker
    pub fn subscribe(&self) -> broadcast::Receiver<TxEvent> {
        self.inner.bus.subscribe()
    }

    /// Number of hashes being polled
    pub fn active_count(&self) -> usize {
        self.inner.active.len()
    }

    /// Whether `hash` is being polled
    pub fn is_tracking(&self, hash: &H256) -> bool {
        self.inner.active.contains_key(hash)
    }
}

impl std::fmt::Debug for TransactionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionTracker")
            .field("active", &self.inner.active.len())
            .field("bus", &self.inner.bus)
            .finish()
    }
}

async fn poll_loop(
    inner: Arc<Inner>,
    hash: H256,
    id: u64,
    schedule: PollSchedule,
    progress: watch::Sender<Progress>,
    control: Arc<Control>,
) {
    let started = Instant::now();
    // A timeout past the clock's range means no deadline
    let deadline = schedule
        .timeout
        .and_then(|timeout| started.checked_add(timeout));
    let mut interval = schedule.interval;
    let mut polls = 0u32;

    loop {
        let next = Instant::now()
            .checked_add(interval)
            .unwrap_or_else(far_future);
        let wake_at = match deadline {
            Some(deadline) => next.min(deadline),
            None => next,
        };
        tokio::select! {
            _ = tokio::time::sleep_until(wake_at) => {}
            _ = control.cancelled() => {}
        }
        if control.is_cancelled() {
            debug!(%hash, "poll task stopped");
            return;
        }

        polls += 1;
        let result = inner.client.get_receipt(&hash).await;
        if control.is_cancelled() {
            debug!(%hash, "discarding poll result after cancel");
            return;
        }

        match result {
            Ok(Some(receipt)) => {
                finish(&inner, hash, id, TxOutcome::from_receipt(receipt), &progress, polls);
                return;
            }
            Ok(None) => {
                trace!(%hash, polls, "receipt not found");
            }
            Err(e) if e.is_unknown_transaction() => {
                trace!(%hash, polls, "transaction unknown to node");
            }
            Err(e) if e.is_transient() => {
                warn!(%hash, polls, error = %e, "receipt poll failed, retrying");
            }
            Err(e) => {
                error!(%hash, polls, error = %e, "unexpected receipt poll error, retrying");
            }
        }
        interval = schedule.next_interval(interval);
        progress.send_modify(|p| p.polls = polls);

        let polls_exhausted = schedule.max_polls.map_or(false, |max| polls >= max);
        let expired = deadline.map_or(false, |deadline| Instant::now() >= deadline);
        if polls_exhausted || expired {
            finish(&inner, hash, id, TxOutcome::TimedOut, &progress, polls);
            return;
        }
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400 * 365 * 30)
}

/// Publish a terminal outcome unless the hash was cancelled meanwhile
fn finish(
    inner: &Inner,
    hash: H256,
    id: u64,
    outcome: TxOutcome,
    progress: &watch::Sender<Progress>,
    polls: u32,
) {
    let listeners = match inner.active.entry(hash) {
        Entry::Occupied(entry) if entry.get().id == id => {
            let listeners = inner.bus.complete(hash, &outcome);
            entry.remove();
            listeners
        }
        _ => {
            debug!(%hash, "outcome discarded, no longer tracked");
            return;
        }
    };

    progress.send_replace(Progress::finished(&outcome, polls));
    match &outcome {
        TxOutcome::MinedSuccess(receipt) => {
            info!(%hash, block = receipt.block_number, gas_used = receipt.gas_used, polls, "transaction mined")
        }
        TxOutcome::MinedRevert(receipt) => {
            warn!(%hash, block = receipt.block_number, polls, "transaction reverted")
        }
        TxOutcome::TimedOut => warn!(%hash, polls, "transaction tracking timed out"),
        TxOutcome::Cancelled => {}
    }
    inner.bus.deliver(hash, &outcome, listeners);
}
