//! Timed chain snapshots.
//!
//! A snapshot binds a timestamp to the committed state root current at
//! the moment it was taken, together with the block that produced that
//! root. The registry lives in the state's backing store, so snapshots
//! survive a reload and historical state can be re-opened and queried.

use crate::errors::StateError;
use crate::memory_db::MemoryDb;
use crate::statedb::StateDb;
use crate::Result;
use primitive_types::H256;
use serde::{Deserialize, Serialize};
use shared_types::Name;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Db key of the snapshot registry.
const REGISTRY_KEY: &[u8] = b"snapshot:registry";

/// The block a snapshot was taken at.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Block number.
    pub number: u64,

    /// Block hash.
    pub block_hash: H256,

    /// Block timestamp.
    pub timestamp: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    info: BlockInfo,
    root: H256,
    /// Time of the previous snapshot, 0 for the first.
    prev_time: u64,
}

/// Manager for the time-indexed snapshot registry.
pub struct SnapshotManager {
    db: Arc<MemoryDb>,
    root: H256,
}

impl SnapshotManager {
    /// Create a manager over the given state's store and current root.
    pub fn new(state: &StateDb) -> Self {
        Self {
            db: state.db(),
            root: state.origin_root(),
        }
    }

    /// Record a snapshot of the current root at `time`.
    ///
    /// Times must be strictly increasing across calls.
    pub fn set_snapshot(&self, time: u64, info: BlockInfo) -> Result<()> {
        let mut registry = self.load_registry()?;
        let prev_time = registry.keys().next_back().copied().unwrap_or(0);
        if time <= prev_time {
            return Err(StateError::SnapshotOutOfOrder {
                time,
                last: prev_time,
            });
        }
        registry.insert(
            time,
            SnapshotRecord {
                info,
                root: self.root,
                prev_time,
            },
        );
        self.store_registry(&registry)
    }

    /// The time of the most recent snapshot.
    pub fn get_last_snapshot_time(&self) -> Result<u64> {
        let registry = self.load_registry()?;
        registry
            .keys()
            .next_back()
            .copied()
            .ok_or(StateError::SnapshotNotFound(0))
    }

    /// The time of the snapshot preceding `time` (0 for the first).
    pub fn get_prev_snapshot_time(&self, time: u64) -> Result<u64> {
        let registry = self.load_registry()?;
        registry
            .get(&time)
            .map(|record| record.prev_time)
            .ok_or(StateError::SnapshotNotFound(time))
    }

    /// The time and root of the most recent snapshot.
    pub fn get_current_snapshot_hash(&self) -> Result<(u64, H256)> {
        let registry = self.load_registry()?;
        registry
            .iter()
            .next_back()
            .map(|(time, record)| (*time, record.root))
            .ok_or(StateError::SnapshotNotFound(0))
    }

    /// Re-open the state recorded at `time`.
    pub fn get_snapshot_state(&self, time: u64) -> Result<StateDb> {
        let registry = self.load_registry()?;
        let record = registry
            .get(&time)
            .ok_or(StateError::SnapshotNotFound(time))?;
        StateDb::open(Arc::clone(&self.db), record.root)
    }

    /// Read `account`/`key` out of the state recorded at `time`.
    pub fn get_snapshot_msg(&self, account: &Name, key: &str, time: u64) -> Result<Vec<u8>> {
        let state = self.get_snapshot_state(time)?;
        state
            .get(account, key)
            .ok_or_else(|| StateError::SnapshotMsgNotFound {
                account: account.clone(),
                key: key.to_string(),
                time,
            })
    }

    fn load_registry(&self) -> Result<BTreeMap<u64, SnapshotRecord>> {
        match self.db.get(REGISTRY_KEY) {
            None => Ok(BTreeMap::new()),
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StateError::Codec(e.to_string()))
            }
        }
    }

    fn store_registry(&self, registry: &BTreeMap<u64, SnapshotRecord>) -> Result<()> {
        let bytes =
            serde_json::to_vec(registry).map_err(|e| StateError::Codec(e.to_string()))?;
        self.db.put(REGISTRY_KEY.to_vec(), bytes);
        Ok(())
    }
}
