//! Port implementations over the real chain and pool.

use crate::error::Result;
use crate::ports::{ChainPort, PendingPort};
use async_trait::async_trait;
use mc_chain::Blockchain;
use mc_state::StateDb;
use mc_txpool::TxPool;
use primitive_types::H256;
use shared_types::{Block, BlockHeader, GasPool, Name, Receipt, Transaction, TxError};
use std::collections::BTreeMap;

#[async_trait]
impl ChainPort for Blockchain {
    fn current_header(&self) -> BlockHeader {
        Blockchain::current_header(self)
    }

    fn sys_name(&self) -> Name {
        Blockchain::sys_name(self).clone()
    }

    fn state_at(&self, root: H256) -> Result<StateDb> {
        Ok(Blockchain::state_at(self, root)?)
    }

    fn fill_fork_id(&self, header: &mut BlockHeader, state: &StateDb) -> Result<()> {
        Ok(Blockchain::fill_fork_id(self, header, state)?)
    }

    async fn apply_transaction(
        &self,
        coinbase: Option<&Name>,
        pool: &mut GasPool,
        state: &mut StateDb,
        header: &BlockHeader,
        tx: &Transaction,
    ) -> std::result::Result<(Receipt, u64), TxError> {
        Blockchain::apply_transaction(self, coinbase, pool, state, header, tx)
    }

    fn finalize(
        &self,
        header: &BlockHeader,
        txs: &[Transaction],
        receipts: &[Receipt],
        state: &StateDb,
    ) -> Result<Block> {
        Ok(Blockchain::finalize(self, header, txs, receipts, state)?)
    }

    async fn write_block_with_state(
        &self,
        block: &Block,
        receipts: &[Receipt],
        state: &mut StateDb,
    ) -> Result<()> {
        Ok(Blockchain::write_block_with_state(self, block, receipts, state)?)
    }
}

#[async_trait]
impl PendingPort for TxPool {
    async fn pending(&self) -> Result<BTreeMap<Name, Vec<Transaction>>> {
        Ok(TxPool::pending(self))
    }
}
