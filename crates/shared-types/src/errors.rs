//! Transaction application errors.
//!
//! These are the outcomes the block assembler classifies to decide the
//! ordering-queue action for a failed transaction. They are shared
//! types because they cross the executor/miner seam.

use crate::name::Name;
use primitive_types::U256;
use thiserror::Error;

/// Why applying a transaction failed.
///
/// None of these abort block assembly; each maps to a queue action
/// (drop the sender, skip the transaction) in the assembler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    /// The block gas pool cannot cover the transaction's gas limit.
    #[error("gas limit reached")]
    GasLimitReached,

    /// The transaction nonce is behind the sender's account nonce.
    #[error("nonce too low: have {have}, want {want}")]
    NonceTooLow {
        /// Nonce carried by the transaction.
        have: u64,
        /// Nonce the account expects next.
        want: u64,
    },

    /// The transaction nonce is ahead of the sender's account nonce.
    #[error("nonce too high: have {have}, want {want}")]
    NonceTooHigh {
        /// Nonce carried by the transaction.
        have: u64,
        /// Nonce the account expects next.
        want: u64,
    },

    /// The sender cannot cover value plus fee.
    #[error("insufficient balance for {name}: need {need}, have {have}")]
    InsufficientBalance {
        /// The underfunded account.
        name: Name,
        /// Value plus fee required.
        need: U256,
        /// Balance available.
        have: U256,
    },

    /// The action's own gas limit cannot cover its intrinsic gas.
    #[error("intrinsic gas too low: limit {limit}, need {need}")]
    IntrinsicGas {
        /// Gas limit carried by the action.
        limit: u64,
        /// Intrinsic gas required.
        need: u64,
    },

    /// The named account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(Name),

    /// Anything else the executor rejects.
    #[error("{0}")]
    Other(String),
}
