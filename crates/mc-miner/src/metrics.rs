//! Metrics collection for the worker.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-worker production counters.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Blocks sealed, persisted, and announced.
    pub blocks_mined: AtomicU64,

    /// Transactions committed into mined blocks.
    pub txs_committed: AtomicU64,

    /// In-flight attempts cancelled because a foreign head arrived.
    pub head_cancels: AtomicU64,

    /// In-flight attempts cancelled by the next slot boundary.
    pub slot_cancels: AtomicU64,

    /// Attempts that ended in a slot-terminal error.
    pub attempts_failed: AtomicU64,
}

impl Metrics {
    /// Create a zeroed collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mined block with its transaction count.
    pub fn record_block_mined(&self, tx_count: u64) {
        self.blocks_mined.fetch_add(1, Ordering::Relaxed);
        self.txs_committed.fetch_add(tx_count, Ordering::Relaxed);
    }

    /// Record a head-event cancellation.
    pub fn record_head_cancel(&self) {
        self.head_cancels.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a slot-boundary cancellation.
    pub fn record_slot_cancel(&self) {
        self.slot_cancels.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed attempt.
    pub fn record_attempt_failed(&self) {
        self.attempts_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Blocks mined so far.
    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    /// Head-event cancellations so far.
    pub fn head_cancels(&self) -> u64 {
        self.head_cancels.load(Ordering::Relaxed)
    }
}
