//! Error types for the state subsystem.

use primitive_types::H256;
use shared_types::Name;
use thiserror::Error;

/// Errors from state, account, and snapshot operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// No committed state exists for the given root.
    #[error("state not found for root {0:?}")]
    StateNotFound(H256),

    /// The named account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(Name),

    /// The account is already registered.
    #[error("account already exists: {0}")]
    AccountExists(Name),

    /// A debit would push the balance below zero.
    #[error("balance underflow for {0}")]
    BalanceUnderflow(Name),

    /// No registered author key of the account matches.
    #[error("no matching author key for {0}")]
    InvalidSign(Name),

    /// No snapshot recorded for the given time.
    #[error("snapshot not found for time {0}")]
    SnapshotNotFound(u64),

    /// The snapshot exists but holds no value under the given key.
    #[error("snapshot message not found: {account}/{key} at {time}")]
    SnapshotMsgNotFound {
        /// Account queried.
        account: Name,
        /// Storage key queried.
        key: String,
        /// Snapshot time queried.
        time: u64,
    },

    /// Snapshot times must be strictly increasing.
    #[error("snapshot time {time} not after last {last}")]
    SnapshotOutOfOrder {
        /// Rejected time.
        time: u64,
        /// Most recent recorded time.
        last: u64,
    },

    /// Encoding or decoding a persisted blob failed.
    #[error("codec: {0}")]
    Codec(String),
}
