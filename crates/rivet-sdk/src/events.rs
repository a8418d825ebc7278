//! Per-tracker lifecycle notifications
//!
//! Every [`TransactionTracker`](crate::TransactionTracker) owns one
//! [`EventBus`]. Per-hash listeners are one-shot: they are removed when the
//! hash reaches a terminal state (firing the matching ones) or is cancelled
//! (firing none). [`EventBus::subscribe`] additionally streams every
//! lifecycle event.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use rivet_primitives::H256;
use tokio::sync::broadcast;

use crate::tracker::TxOutcome;
use crate::types::Receipt;

/// Lifecycle event broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
    /// Mined with success status
    Mined {
        /// Tracked hash
        hash: H256,
        /// Receipt
        receipt: Receipt,
    },
    /// Mined with failure status
    Failed {
        /// Tracked hash
        hash: H256,
        /// Receipt
        receipt: Receipt,
    },
    /// No receipt within the poll or time limit
    TimedOut {
        /// Tracked hash
        hash: H256,
    },
    /// Tracking cancelled before a terminal state
    Cancelled {
        /// Tracked hash
        hash: H256,
    },
}

impl TxEvent {
    /// Hash the event refers to
    pub fn hash(&self) -> H256 {
        match self {
            TxEvent::Mined { hash, .. }
            | TxEvent::Failed { hash, .. }
            | TxEvent::TimedOut { hash }
            | TxEvent::Cancelled { hash } => *hash,
        }
    }
}

type ReceiptCallback = Box<dyn FnOnce(&Receipt) + Send>;
type HashCallback = Box<dyn FnOnce(H256) + Send>;

#[derive(Default)]
pub(crate) struct Listeners {
    mined: Vec<ReceiptCallback>,
    failed: Vec<ReceiptCallback>,
    timeout: Vec<HashCallback>,
}

impl Listeners {
    fn len(&self) -> usize {
        self.mined.len() + self.failed.len() + self.timeout.len()
    }
}

#[derive(Default)]
struct BusState {
    listeners: HashMap<H256, Listeners>,
    /// Mined outcomes, oldest first
    completed: HashMap<H256, TxOutcome>,
    completed_order: VecDeque<H256>,
}

/// Listener registry and broadcast channel owned by one tracker
pub struct EventBus {
    state: Mutex<BusState>,
    sender: broadcast::Sender<TxEvent>,
    completed_capacity: usize,
}

impl EventBus {
    /// Create a bus buffering `event_capacity` broadcast events and
    /// remembering up to `completed_capacity` mined outcomes
    pub fn new(event_capacity: usize, completed_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(event_capacity.max(1));
        Self {
            state: Mutex::new(BusState::default()),
            sender,
            completed_capacity,
        }
    }

    /// Stream of every lifecycle event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<TxEvent> {
        self.sender.subscribe()
    }

    /// Number of pending listeners for `hash`
    pub fn listener_count(&self, hash: &H256) -> usize {
        self.state
            .lock()
            .listeners
            .get(hash)
            .map_or(0, Listeners::len)
    }

    /// Remembered outcome of a mined hash
    pub fn completed(&self, hash: &H256) -> Option<TxOutcome> {
        self.state.lock().completed.get(hash).cloned()
    }

    pub(crate) fn on_mined<F>(&self, hash: H256, callback: F)
    where
        F: FnOnce(&Receipt) + Send + 'static,
    {
        let mut state = self.state.lock();
        let cached = state.completed.get(&hash).cloned();
        match cached {
            Some(TxOutcome::MinedSuccess(receipt)) => {
                drop(state);
                callback(&receipt);
            }
            Some(_) => {}
            None => state
                .listeners
                .entry(hash)
                .or_default()
                .mined
                .push(Box::new(callback)),
        }
    }

    pub(crate) fn on_failed<F>(&self, hash: H256, callback: F)
    where
        F: FnOnce(&Receipt) + Send + 'static,
    {
        let mut state = self.state.lock();
        let cached = state.completed.get(&hash).cloned();
        match cached {
            Some(TxOutcome::MinedRevert(receipt)) => {
                drop(state);
                callback(&receipt);
            }
            Some(_) => {}
            None => state
                .listeners
                .entry(hash)
                .or_default()
                .failed
                .push(Box::new(callback)),
        }
    }

    pub(crate) fn on_timeout<F>(&self, hash: H256, callback: F)
    where
        F: FnOnce(H256) + Send + 'static,
    {
        let mut state = self.state.lock();
        // Mined hashes never time out
        if !state.completed.contains_key(&hash) {
            state
                .listeners
                .entry(hash)
                .or_default()
                .timeout
                .push(Box::new(callback));
        }
    }

    /// Record a terminal outcome and detach the hash's listeners
    ///
    /// Called while the tracker still holds the hash's active-set entry so a
    /// concurrent `track` observes either the active entry or the cached
    /// outcome.
    pub(crate) fn complete(&self, hash: H256, outcome: &TxOutcome) -> Listeners {
        let mut state = self.state.lock();
        if outcome.is_mined() && self.completed_capacity > 0 {
            if state.completed.insert(hash, outcome.clone()).is_none() {
                state.completed_order.push_back(hash);
            }
            while state.completed_order.len() > self.completed_capacity {
                if let Some(evicted) = state.completed_order.pop_front() {
                    state.completed.remove(&evicted);
                }
            }
        }
        state.listeners.remove(&hash).unwrap_or_default()
    }

    /// Fire the listeners matching `outcome` and broadcast it
    ///
    /// Must be called without holding any tracker lock.
    pub(crate) fn deliver(&self, hash: H256, outcome: &TxOutcome, listeners: Listeners) {
        let event = match outcome {
            TxOutcome::MinedSuccess(receipt) => {
                for callback in listeners.mined {
                    callback(receipt);
                }
                TxEvent::Mined { hash, receipt: receipt.clone() }
            }
            TxOutcome::MinedRevert(receipt) => {
                for callback in listeners.failed {
                    callback(receipt);
                }
                TxEvent::Failed { hash, receipt: receipt.clone() }
            }
            TxOutcome::TimedOut => {
                for callback in listeners.timeout {
                    callback(hash);
                }
                TxEvent::TimedOut { hash }
            }
            TxOutcome::Cancelled => TxEvent::Cancelled { hash },
        };
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    /// Drop listeners registered for `hash` without firing them
    ///
    /// Returns how many were removed. Listeners for a hash that is never
    /// tracked otherwise stay registered until the bus is dropped.
    pub fn remove_listeners(&self, hash: &H256) -> usize {
        let removed = self.state.lock().listeners.remove(hash);
        removed.map_or(0, |listeners| listeners.len())
    }

    /// Drop every registered listener without firing it
    pub fn clear_listeners(&self) -> usize {
        let removed = std::mem::take(&mut self.state.lock().listeners);
        removed.values().map(Listeners::len).sum()
    }

    /// Drop the hash's listeners without firing them
    pub(crate) fn discard(&self, hash: H256) {
        let dropped = self.state.lock().listeners.remove(&hash);
        drop(dropped);
        let _ = self.sender.send(TxEvent::Cancelled { hash });
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventBus")
            .field("listening", &state.listeners.len())
            .field("completed", &state.completed.len())
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}
