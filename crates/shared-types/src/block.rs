//! Block headers and blocks.

use crate::hash::canonical_hash;
use crate::name::Name;
use crate::transaction::Transaction;
use primitive_types::{H256, U256};
use serde::{Deserialize, Serialize};

/// A block header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Hash of the parent header.
    pub parent_hash: H256,

    /// Block number: always parent number + 1.
    pub number: u64,

    /// Protocol gas limit for this block.
    pub gas_limit: u64,

    /// Gas consumed by the block's transactions.
    pub gas_used: u64,

    /// Operator-configurable extra data.
    pub extra: Vec<u8>,

    /// Slot timestamp in Unix nanoseconds.
    pub timestamp: u64,

    /// Difficulty, computed by the consensus engine from parent + slot.
    pub difficulty: U256,

    /// Canonical name of the producing validator.
    pub coinbase: Name,

    /// Block number the producer asserts has reached finality.
    pub proposed_irreversible: u64,

    /// Identifier of the active protocol ruleset.
    pub fork_id: u64,

    /// State root after executing this block.
    pub root: H256,

    /// Root over the block's receipts.
    pub receipts_root: H256,

    /// Producer signature over [`Self::sig_hash`]. Empty until sealed.
    pub sign: Vec<u8>,
}

impl BlockHeader {
    /// Hash of the full header, signature included.
    ///
    /// This is the block hash once the header is sealed.
    pub fn hash(&self) -> H256 {
        canonical_hash(self)
    }

    /// Hash of the header with the signature field cleared.
    ///
    /// This is the content the producer signs.
    pub fn sig_hash(&self) -> H256 {
        let mut unsigned = self.clone();
        unsigned.sign = Vec::new();
        canonical_hash(&unsigned)
    }
}

/// A block: a header plus its transactions.
///
/// Receipts travel separately; they are persisted alongside the block
/// but are not part of its identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,

    /// Transactions in execution order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Assemble a block from a header and its transactions.
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    /// The block hash (the sealed header hash).
    pub fn hash(&self) -> H256 {
        self.header.hash()
    }

    /// The block number.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// The producing validator.
    pub fn coinbase(&self) -> &Name {
        &self.header.coinbase
    }
}
