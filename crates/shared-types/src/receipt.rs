//! Execution receipts and logs.

use crate::name::Name;
use primitive_types::H256;
use serde::{Deserialize, Serialize};

/// An event emitted during action execution.
///
/// The block hash is unknown while the block is being assembled; it is
/// stamped onto every log of every receipt (and onto the state's
/// pending logs) once the block has been sealed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Account that emitted the event.
    pub name: Name,

    /// Indexed topics.
    pub topics: Vec<H256>,

    /// Event payload.
    pub data: Vec<u8>,

    /// Number of the including block.
    pub block_number: u64,

    /// Hash of the including block (stamped post-seal).
    pub block_hash: H256,

    /// Hash of the including transaction.
    pub tx_hash: H256,

    /// Index of the log within the receipt.
    pub index: u64,

    /// Index of the emitting action within the transaction.
    pub action_index: u64,

    /// Index of the transaction within the block.
    pub tx_index: u64,
}

/// The outcome of applying one transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash of the applied transaction.
    pub tx_hash: H256,

    /// Index of the transaction within the block.
    pub tx_index: u64,

    /// 1 on success. Failed transactions never produce a receipt; their
    /// effects are reverted instead.
    pub status: u64,

    /// Gas consumed by this transaction.
    pub gas_used: u64,

    /// Logs emitted during execution.
    pub logs: Vec<Log>,
}
