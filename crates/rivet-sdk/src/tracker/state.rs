//! Handle state shared between a poll task and its observers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rivet_primitives::H256;
use tokio::sync::{watch, Notify};

use crate::types::Receipt;

/// Lifecycle state of a tracked transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// No receipt yet
    Pending,
    /// Mined with success status
    MinedSuccess,
    /// Mined with failure status
    MinedRevert,
    /// Poll or time limit reached without a receipt
    TimedOut,
}

impl TxState {
    /// Whether no further transition can happen
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxState::Pending)
    }
}

/// Final result of tracking a hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Mined with success status
    MinedSuccess(Receipt),
    /// Mined with failure status
    MinedRevert(Receipt),
    /// No receipt within the limits
    TimedOut,
    /// Tracking was cancelled
    Cancelled,
}

impl TxOutcome {
    pub(crate) fn from_receipt(receipt: Receipt) -> Self {
        if receipt.is_success() {
            TxOutcome::MinedSuccess(receipt)
        } else {
            TxOutcome::MinedRevert(receipt)
        }
    }

    /// Whether a receipt was found
    pub fn is_mined(&self) -> bool {
        matches!(self, TxOutcome::MinedSuccess(_) | TxOutcome::MinedRevert(_))
    }

    /// Receipt, when mined
    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            TxOutcome::MinedSuccess(receipt) | TxOutcome::MinedRevert(receipt) => Some(receipt),
            TxOutcome::TimedOut | TxOutcome::Cancelled => None,
        }
    }

    /// Matching handle state; `None` for a cancellation
    pub fn state(&self) -> Option<TxState> {
        match self {
            TxOutcome::MinedSuccess(_) => Some(TxState::MinedSuccess),
            TxOutcome::MinedRevert(_) => Some(TxState::MinedRevert),
            TxOutcome::TimedOut => Some(TxState::TimedOut),
            TxOutcome::Cancelled => None,
        }
    }
}

/// Snapshot published by the poll task
#[derive(Debug, Clone)]
pub(crate) struct Progress {
    pub(crate) state: TxState,
    pub(crate) receipt: Option<Receipt>,
    pub(crate) polls: u32,
}

impl Progress {
    pub(crate) fn pending() -> Self {
        Self {
            state: TxState::Pending,
            receipt: None,
            polls: 0,
        }
    }

    pub(crate) fn finished(outcome: &TxOutcome, polls: u32) -> Self {
        Self {
            state: outcome.state().unwrap_or(TxState::Pending),
            receipt: outcome.receipt().cloned(),
            polls,
        }
    }

    fn outcome(&self) -> Option<TxOutcome> {
        match (self.state, &self.receipt) {
            (TxState::MinedSuccess, Some(receipt)) => Some(TxOutcome::MinedSuccess(receipt.clone())),
            (TxState::MinedRevert, Some(receipt)) => Some(TxOutcome::MinedRevert(receipt.clone())),
            (TxState::TimedOut, _) => Some(TxOutcome::TimedOut),
            _ => None,
        }
    }
}

/// Cooperative cancellation flag with a wake-up for a sleeping poll task
#[derive(Debug, Default)]
pub(crate) struct Control {
    cancelled: AtomicBool,
    wake: Notify,
}

impl Control {
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // Stores a permit if the task is not currently sleeping
        self.wake.notify_one();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) async fn cancelled(&self) {
        self.wake.notified().await
    }
}

/// Observer of one tracked hash
///
/// Cheap to clone. State is written only by the hash's poll task.
#[derive(Debug, Clone)]
pub struct TransactionHandle {
    hash: H256,
    progress: watch::Receiver<Progress>,
    control: Arc<Control>,
}

impl TransactionHandle {
    pub(crate) fn new(hash: H256, progress: watch::Receiver<Progress>, control: Arc<Control>) -> Self {
        Self {
            hash,
            progress,
            control,
        }
    }

    /// Handle for a hash whose outcome is already known
    pub(crate) fn finished(hash: H256, outcome: &TxOutcome) -> Self {
        let (_, progress) = watch::channel(Progress::finished(outcome, 0));
        Self::new(hash, progress, Arc::new(Control::default()))
    }

    pub(crate) fn control(&self) -> &Arc<Control> {
        &self.control
    }

    /// Tracked hash
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// Current state
    pub fn state(&self) -> TxState {
        self.progress.borrow().state
    }

    /// Receipt once mined
    pub fn receipt(&self) -> Option<Receipt> {
        self.progress.borrow().receipt.clone()
    }

    /// Receipt polls performed so far
    pub fn polls(&self) -> u32 {
        self.progress.borrow().polls
    }

    /// Whether the state is terminal
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Whether tracking was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }

    /// Wait for the terminal outcome
    ///
    /// Resolves to [`TxOutcome::Cancelled`] if tracking is cancelled first.
    pub async fn wait(&self) -> TxOutcome {
        let mut progress = self.progress.clone();
        loop {
            let outcome = progress.borrow_and_update().outcome();
            if let Some(outcome) = outcome {
                return outcome;
            }
            if progress.changed().await.is_err() {
                // Poll task gone; a terminal state may have been its last write
                return progress.borrow().outcome().unwrap_or(TxOutcome::Cancelled);
            }
        }
    }
}
