//! Error types for block production.

use mc_chain::ChainError;
use mc_dpos::DposError;
use thiserror::Error;

/// Result alias for miner operations.
pub type Result<T> = std::result::Result<T, MinerError>;

/// Errors from one block-production attempt.
///
/// Three tiers: `WaitParent` is retried within the slot after a short
/// nap; `Cancelled` ends the attempt silently; everything else is
/// terminal for the slot and the next slot starts clean.
#[derive(Debug, Error)]
pub enum MinerError {
    /// The slot had already ended when assembly started.
    #[error("mint the ignore block: slot {slot} expired at {now}")]
    SlotExpired {
        /// The slot timestamp that was attempted.
        slot: u64,
        /// Wall clock at the attempt.
        now: u64,
    },

    /// The parent is not older than the slot being minted.
    #[error("mint the old block: parent timestamp {parent} not before slot {slot}")]
    StaleParent {
        /// Parent header timestamp.
        parent: u64,
        /// The slot timestamp that was attempted.
        slot: u64,
    },

    /// The previous slot's block may still be in flight; retry shortly.
    #[error("wait for last block arrived")]
    WaitParent,

    /// The attempt's cancellation token fired.
    #[error("work cancelled")]
    Cancelled,

    /// Consensus rejected a prepare or seal step.
    #[error("consensus: {0}")]
    Consensus(#[from] DposError),

    /// The chain layer failed.
    #[error("chain: {0}")]
    Chain(#[from] ChainError),

    /// Fetching pending transactions failed.
    #[error("fetch pending transactions: {0}")]
    Pending(String),
}

impl MinerError {
    /// Whether the slot loop should retry this attempt within the slot.
    pub fn is_wait(&self) -> bool {
        matches!(self, Self::WaitParent)
    }

    /// Whether this is the cooperative-cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether the slot itself was unusable (expired or stale parent),
    /// as opposed to a failure while using it.
    pub fn is_bad_slot(&self) -> bool {
        matches!(self, Self::SlotExpired { .. } | Self::StaleParent { .. })
    }
}
