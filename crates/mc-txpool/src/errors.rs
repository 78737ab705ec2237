//! Error types for the transaction pool.

use primitive_types::{H256, U256};
use shared_types::Name;
use thiserror::Error;

/// Errors from pool admission.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxPoolError {
    /// The exact transaction is already pending.
    #[error("transaction already known: {0:?}")]
    DuplicateTransaction(H256),

    /// A replacement for a pending nonce did not raise the price.
    #[error("replacement underpriced for {sender} nonce {nonce}: offered {offered}, pending {pending}")]
    ReplacementUnderpriced {
        /// Sender whose slot is contested.
        sender: Name,
        /// Contested nonce.
        nonce: u64,
        /// Price offered by the replacement.
        offered: U256,
        /// Price of the pending transaction.
        pending: U256,
    },

    /// The sender already holds the maximum number of pending slots.
    #[error("account limit reached for {sender}: {limit} pending")]
    AccountLimitReached {
        /// Sender at its limit.
        sender: Name,
        /// Configured per-account limit.
        limit: usize,
    },
}
