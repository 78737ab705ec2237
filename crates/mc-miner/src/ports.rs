//! Outbound ports (driven side).
//!
//! The worker talks to the chain and the transaction pool exclusively
//! through these traits, so tests can interpose counting, delaying, or
//! failing implementations around the real ones.

use crate::error::Result;
use async_trait::async_trait;
use mc_state::StateDb;
use primitive_types::H256;
use shared_types::{Block, BlockHeader, GasPool, Name, Receipt, Transaction, TxError};
use std::collections::BTreeMap;

/// Port: the chain capability set the assembler drives.
#[async_trait]
pub trait ChainPort: Send + Sync {
    /// The current canonical head.
    fn current_header(&self) -> BlockHeader;

    /// The privileged system account name.
    fn sys_name(&self) -> Name;

    /// Fork a mutable state from a committed root.
    fn state_at(&self, root: H256) -> Result<StateDb>;

    /// Stamp the active fork identifier from state onto `header`.
    fn fill_fork_id(&self, header: &mut BlockHeader, state: &StateDb) -> Result<()>;

    /// Apply one transaction against the work's state fork.
    ///
    /// Failures are [`TxError`], classified by the drain loop into a
    /// queue action; they never abort assembly.
    async fn apply_transaction(
        &self,
        coinbase: Option<&Name>,
        pool: &mut GasPool,
        state: &mut StateDb,
        header: &BlockHeader,
        tx: &Transaction,
    ) -> std::result::Result<(Receipt, u64), TxError>;

    /// Close the header over its executed state into a canonical block.
    fn finalize(
        &self,
        header: &BlockHeader,
        txs: &[Transaction],
        receipts: &[Receipt],
        state: &StateDb,
    ) -> Result<Block>;

    /// Atomically persist a sealed block with its receipts and state.
    async fn write_block_with_state(
        &self,
        block: &Block,
        receipts: &[Receipt],
        state: &mut StateDb,
    ) -> Result<()>;
}

/// Port: pending-transaction source.
#[async_trait]
pub trait PendingPort: Send + Sync {
    /// A per-sender snapshot of pending transactions, nonce-ascending.
    async fn pending(&self) -> Result<BTreeMap<Name, Vec<Transaction>>>;
}
