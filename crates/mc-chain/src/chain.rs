//! The canonical chain.

use crate::config::ChainConfig;
use crate::errors::ChainError;
use crate::executor;
use crate::Result;
use mc_dpos::{Dpos, FORK_ID_KEY};
use mc_state::{MemoryDb, StateDb};
use parking_lot::RwLock;
use primitive_types::H256;
use shared_types::params::BLOCK_GAS_LIMIT;
use shared_types::{
    canonical_hash, Block, BlockHeader, GasPool, Name, Receipt, Transaction, TxError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

struct ChainInner {
    head: BlockHeader,
    blocks_by_hash: HashMap<H256, Arc<Block>>,
    hash_by_number: HashMap<u64, H256>,
    receipts: HashMap<H256, Vec<Receipt>>,
}

/// The canonical chain: head tracking, block persistence, and the
/// executor seam the producer applies transactions through.
pub struct Blockchain {
    config: ChainConfig,
    db: Arc<MemoryDb>,
    inner: RwLock<ChainInner>,
}

impl Blockchain {
    /// Build a chain with a fresh genesis block.
    ///
    /// Genesis funds the configured accounts and seeds the engine's
    /// candidate schedule into state, so governance actions can later
    /// amend it.
    pub fn new(config: ChainConfig, engine: &Dpos, db: Arc<MemoryDb>) -> Result<Self> {
        let mut state = StateDb::open(Arc::clone(&db), H256::zero())?;
        for account in &config.accounts {
            state
                .create_account(&account.name, account.author.clone())
                .map_err(|e| ChainError::Genesis(e.to_string()))?;
            state.add_balance(&account.name, account.balance)?;
        }
        engine.store_candidates(&mut state, &engine.config().validators);

        let root = state.commit(H256::zero(), 0)?;
        let header = BlockHeader {
            parent_hash: H256::zero(),
            number: 0,
            gas_limit: BLOCK_GAS_LIMIT,
            gas_used: 0,
            extra: config.chain_name.clone().into_bytes(),
            timestamp: 0,
            difficulty: Default::default(),
            coinbase: config.sys_name.clone(),
            proposed_irreversible: 0,
            fork_id: 0,
            root,
            receipts_root: canonical_hash(&Vec::<Receipt>::new()),
            sign: Vec::new(),
        };
        let genesis = Arc::new(Block::new(header.clone(), Vec::new()));
        let hash = genesis.hash();

        info!(%hash, "[mc-chain] genesis block created");

        Ok(Self {
            config,
            db,
            inner: RwLock::new(ChainInner {
                head: header,
                blocks_by_hash: HashMap::from([(hash, genesis)]),
                hash_by_number: HashMap::from([(0, hash)]),
                receipts: HashMap::from([(hash, Vec::new())]),
            }),
        })
    }

    /// The privileged system account.
    pub fn sys_name(&self) -> &Name {
        &self.config.sys_name
    }

    /// The current head header.
    pub fn current_header(&self) -> BlockHeader {
        self.inner.read().head.clone()
    }

    /// Look up a block by hash.
    pub fn block_by_hash(&self, hash: &H256) -> Option<Arc<Block>> {
        self.inner.read().blocks_by_hash.get(hash).cloned()
    }

    /// Look up a block by number.
    pub fn block_by_number(&self, number: u64) -> Option<Arc<Block>> {
        let inner = self.inner.read();
        let hash = inner.hash_by_number.get(&number)?;
        inner.blocks_by_hash.get(hash).cloned()
    }

    /// Receipts of a persisted block.
    pub fn receipts_by_hash(&self, hash: &H256) -> Option<Vec<Receipt>> {
        self.inner.read().receipts.get(hash).cloned()
    }

    /// Fork a mutable state from a committed root.
    pub fn state_at(&self, root: H256) -> Result<StateDb> {
        Ok(StateDb::open(Arc::clone(&self.db), root)?)
    }

    /// Stamp the active fork identifier from state onto `header`.
    pub fn fill_fork_id(&self, header: &mut BlockHeader, state: &StateDb) -> Result<()> {
        header.fork_id = state
            .get(&self.config.sys_name, FORK_ID_KEY)
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or(0);
        Ok(())
    }

    /// Apply one transaction against a state fork.
    ///
    /// See [`executor::apply_transaction`]; the chain supplies its
    /// system account so governance actions address the right storage.
    pub fn apply_transaction(
        &self,
        coinbase: Option<&Name>,
        pool: &mut GasPool,
        state: &mut StateDb,
        header: &BlockHeader,
        tx: &Transaction,
    ) -> std::result::Result<(Receipt, u64), TxError> {
        executor::apply_transaction(coinbase, pool, state, header, &self.config.sys_name, tx)
    }

    /// Close a header over its executed state and body.
    ///
    /// Fills the state root and receipts root and returns the canonical
    /// block. The state is not committed; that happens in
    /// [`Self::write_block_with_state`].
    pub fn finalize(
        &self,
        header: &BlockHeader,
        txs: &[Transaction],
        receipts: &[Receipt],
        state: &StateDb,
    ) -> Result<Block> {
        let mut header = header.clone();
        header.root = state.root_hash();
        header.receipts_root = canonical_hash(&receipts);
        Ok(Block::new(header, txs.to_vec()))
    }

    /// Atomically persist a sealed block, its receipts, and its state,
    /// and advance the head.
    pub fn write_block_with_state(
        &self,
        block: &Block,
        receipts: &[Receipt],
        state: &mut StateDb,
    ) -> Result<()> {
        let computed = state.root_hash();
        if block.header.root != computed {
            return Err(ChainError::RootMismatch {
                header: block.header.root,
                computed,
            });
        }

        let mut inner = self.inner.write();
        let head_hash = inner.head.hash();
        if block.header.parent_hash != head_hash {
            return Err(ChainError::NotCanonicalHead {
                parent: block.header.parent_hash,
                head: head_hash,
            });
        }

        state.commit(block.hash(), block.number())?;

        let hash = block.hash();
        inner.blocks_by_hash.insert(hash, Arc::new(block.clone()));
        inner.hash_by_number.insert(block.number(), hash);
        inner.receipts.insert(hash, receipts.to_vec());
        inner.head = block.header.clone();

        debug!(
            number = block.number(),
            %hash,
            txs = block.transactions.len(),
            "[mc-chain] block written"
        );
        Ok(())
    }
}
