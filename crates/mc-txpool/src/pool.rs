//! The pending transaction pool.
//!
//! Two indices are maintained:
//!
//! - `by_hash`: O(1) duplicate detection
//! - `by_sender`: per-sender nonce-ordered transactions (`BTreeMap`
//!   keys keep nonces sorted without extra work)
//!
//! Admission policy beyond duplicate/replacement/slot-limit checks is
//! out of scope; anything the pool accepts is surfaced by `pending()`.

use crate::errors::TxPoolError;
use crate::Result;
use parking_lot::RwLock;
use primitive_types::H256;
use serde::Deserialize;
use shared_types::{Name, Transaction};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Pool configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct TxPoolConfig {
    /// Maximum pending transactions per sender.
    pub max_account_slots: usize,
}

impl Default for TxPoolConfig {
    fn default() -> Self {
        Self {
            max_account_slots: 64,
        }
    }
}

#[derive(Default)]
struct PoolInner {
    by_hash: HashMap<H256, ()>,
    by_sender: BTreeMap<Name, BTreeMap<u64, Transaction>>,
}

/// The pending pool.
///
/// Internally locked so the miner and ingestion paths can share one
/// handle.
pub struct TxPool {
    config: TxPoolConfig,
    inner: RwLock<PoolInner>,
}

impl TxPool {
    /// Create a pool with the given configuration.
    pub fn new(config: TxPoolConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(PoolInner::default()),
        }
    }

    /// Create a pool with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TxPoolConfig::default())
    }

    /// Admit a transaction.
    ///
    /// A transaction for an already-pending nonce replaces the pending
    /// one only if it raises the gas price.
    pub fn add(&self, tx: Transaction) -> Result<()> {
        let hash = tx.hash();
        let sender = tx.sender().clone();
        let nonce = tx.nonce();

        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if inner.by_hash.contains_key(&hash) {
            return Err(TxPoolError::DuplicateTransaction(hash));
        }

        let slots = inner.by_sender.entry(sender.clone()).or_default();
        if let Some(pending) = slots.get(&nonce) {
            if tx.gas_price <= pending.gas_price {
                return Err(TxPoolError::ReplacementUnderpriced {
                    sender,
                    nonce,
                    offered: tx.gas_price,
                    pending: pending.gas_price,
                });
            }
            let old_hash = pending.hash();
            slots.insert(nonce, tx);
            inner.by_hash.remove(&old_hash);
            inner.by_hash.insert(hash, ());
            trace!(%sender, nonce, "[mc-txpool] replaced pending transaction");
            return Ok(());
        }

        if slots.len() >= self.config.max_account_slots {
            return Err(TxPoolError::AccountLimitReached {
                sender,
                limit: self.config.max_account_slots,
            });
        }
        slots.insert(nonce, tx);
        inner.by_hash.insert(hash, ());
        Ok(())
    }

    /// A per-sender snapshot of everything pending, nonce-ascending.
    pub fn pending(&self) -> BTreeMap<Name, Vec<Transaction>> {
        let inner = self.inner.read();
        inner
            .by_sender
            .iter()
            .filter(|(_, txs)| !txs.is_empty())
            .map(|(sender, txs)| (sender.clone(), txs.values().cloned().collect()))
            .collect()
    }

    /// Drop every pending transaction from `sender` with nonce below
    /// `nonce`. Called when a new head makes them stale.
    pub fn prune_below(&self, sender: &Name, nonce: u64) {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let Some(slots) = inner.by_sender.get_mut(sender) else {
            return;
        };
        let stale: Vec<(u64, H256)> = slots
            .range(..nonce)
            .map(|(n, tx)| (*n, tx.hash()))
            .collect();
        for (n, hash) in &stale {
            slots.remove(n);
            inner.by_hash.remove(hash);
        }
        if slots.is_empty() {
            inner.by_sender.remove(sender);
        }
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.inner.read().by_hash.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().by_hash.is_empty()
    }
}
