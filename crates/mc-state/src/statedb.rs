//! The mutable world-state and its savepoint journal.

use crate::errors::StateError;
use crate::memory_db::MemoryDb;
use crate::Result;
use primitive_types::{H256, U256};
use serde::{Deserialize, Serialize};
use shared_types::{keccak256, Log, Name};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::error;

/// Db key prefix for committed state blobs.
const STATE_KEY_PREFIX: &[u8] = b"state:";

/// An account: nonce, balance, and registered author public keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Next expected transaction nonce.
    pub nonce: u64,

    /// Spendable balance.
    pub balance: U256,

    /// SEC1-encoded public keys allowed to sign for this account.
    pub authors: Vec<Vec<u8>>,
}

/// One reversible operation recorded in the journal.
///
/// Undoing an entry restores exactly the state the operation replaced;
/// a savepoint revert replays the journal tail in reverse.
#[derive(Clone, Debug)]
enum JournalEntry {
    AccountCreated { name: Name },
    NonceChanged { name: Name, prev: u64 },
    BalanceChanged { name: Name, prev: U256 },
    AuthorAdded { name: Name },
    StorageChanged { name: Name, key: String, prev: Option<Vec<u8>> },
    LogAdded,
}

/// A savepoint: a revision id paired with the journal length at the
/// moment it was taken.
#[derive(Clone, Copy, Debug)]
struct Revision {
    id: usize,
    journal_len: usize,
}

/// Canonical serialized form of a committed state.
///
/// `BTreeMap` keys give a deterministic encoding, so equal states hash
/// to equal roots.
#[derive(Serialize, Deserialize)]
struct StateBlob {
    accounts: BTreeMap<Name, Account>,
    storage: BTreeMap<Name, BTreeMap<String, Vec<u8>>>,
}

/// The mutable world-state a block executes against.
///
/// Forked from a committed root, mutated through journaled operations,
/// and either committed back to the store or dropped. A `StateDb` is
/// owned exclusively by its forker; it is not shared across tasks.
pub struct StateDb {
    db: Arc<MemoryDb>,
    origin_root: H256,

    accounts: HashMap<Name, Account>,
    storage: HashMap<Name, BTreeMap<String, Vec<u8>>>,
    logs: Vec<Log>,

    journal: Vec<JournalEntry>,
    revisions: Vec<Revision>,
    next_revision_id: usize,

    // Execution context set by `prepare`; stamped onto emitted logs.
    tx_hash: H256,
    block_hash: H256,
    tx_index: u64,
    tx_log_start: usize,
}

impl StateDb {
    /// Open a state forked from the committed `root`.
    ///
    /// A zero root opens a fresh empty state.
    pub fn open(db: Arc<MemoryDb>, root: H256) -> Result<Self> {
        let (accounts, storage) = if root == H256::zero() {
            (HashMap::new(), HashMap::new())
        } else {
            let blob = db
                .get(&state_key(root))
                .ok_or(StateError::StateNotFound(root))?;
            let decoded: StateBlob =
                serde_json::from_slice(&blob).map_err(|e| StateError::Codec(e.to_string()))?;
            (
                decoded.accounts.into_iter().collect(),
                decoded.storage.into_iter().collect(),
            )
        };

        Ok(Self {
            db,
            origin_root: root,
            accounts,
            storage,
            logs: Vec::new(),
            journal: Vec::new(),
            revisions: Vec::new(),
            next_revision_id: 0,
            tx_hash: H256::zero(),
            block_hash: H256::zero(),
            tx_index: 0,
            tx_log_start: 0,
        })
    }

    /// The backing store this state was opened from.
    pub fn db(&self) -> Arc<MemoryDb> {
        Arc::clone(&self.db)
    }

    /// The committed root this state was forked from.
    pub fn origin_root(&self) -> H256 {
        self.origin_root
    }

    /// Set the execution context for the next transaction.
    ///
    /// Logs emitted until the next `prepare` carry this transaction
    /// hash and in-block index.
    pub fn prepare(&mut self, tx_hash: H256, block_hash: H256, tx_index: u64) {
        self.tx_hash = tx_hash;
        self.block_hash = block_hash;
        self.tx_index = tx_index;
        self.tx_log_start = self.logs.len();
    }

    // ---- accounts ----------------------------------------------------

    /// Whether the account exists.
    pub fn account_exists(&self, name: &Name) -> bool {
        self.accounts.contains_key(name)
    }

    /// Register a new account with one author key.
    pub fn create_account(&mut self, name: &Name, author: Vec<u8>) -> Result<()> {
        if self.accounts.contains_key(name) {
            return Err(StateError::AccountExists(name.clone()));
        }
        self.journal.push(JournalEntry::AccountCreated {
            name: name.clone(),
        });
        self.accounts.insert(
            name.clone(),
            Account {
                nonce: 0,
                balance: U256::zero(),
                authors: vec![author],
            },
        );
        Ok(())
    }

    /// The account's next expected nonce.
    pub fn nonce(&self, name: &Name) -> Result<u64> {
        self.account(name).map(|a| a.nonce)
    }

    /// Advance the account nonce by one.
    pub fn inc_nonce(&mut self, name: &Name) -> Result<()> {
        let prev = self.nonce(name)?;
        self.journal.push(JournalEntry::NonceChanged {
            name: name.clone(),
            prev,
        });
        if let Some(account) = self.accounts.get_mut(name) {
            account.nonce = prev + 1;
        }
        Ok(())
    }

    /// The account's balance.
    pub fn balance(&self, name: &Name) -> Result<U256> {
        self.account(name).map(|a| a.balance)
    }

    /// Credit the account.
    pub fn add_balance(&mut self, name: &Name, amount: U256) -> Result<()> {
        let prev = self.balance(name)?;
        self.journal.push(JournalEntry::BalanceChanged {
            name: name.clone(),
            prev,
        });
        if let Some(account) = self.accounts.get_mut(name) {
            account.balance = prev.saturating_add(amount);
        }
        Ok(())
    }

    /// Debit the account; fails without mutating on underflow.
    pub fn sub_balance(&mut self, name: &Name, amount: U256) -> Result<()> {
        let prev = self.balance(name)?;
        if prev < amount {
            return Err(StateError::BalanceUnderflow(name.clone()));
        }
        self.journal.push(JournalEntry::BalanceChanged {
            name: name.clone(),
            prev,
        });
        if let Some(account) = self.accounts.get_mut(name) {
            account.balance = prev - amount;
        }
        Ok(())
    }

    /// Register an additional author key for the account.
    pub fn add_author(&mut self, name: &Name, author: Vec<u8>) -> Result<()> {
        if !self.accounts.contains_key(name) {
            return Err(StateError::AccountNotFound(name.clone()));
        }
        self.journal.push(JournalEntry::AuthorAdded {
            name: name.clone(),
        });
        if let Some(account) = self.accounts.get_mut(name) {
            account.authors.push(author);
        }
        Ok(())
    }

    /// The account's registered author keys.
    pub fn authors(&self, name: &Name) -> Result<&[Vec<u8>]> {
        self.account(name).map(|a| a.authors.as_slice())
    }

    fn account(&self, name: &Name) -> Result<&Account> {
        self.accounts
            .get(name)
            .ok_or_else(|| StateError::AccountNotFound(name.clone()))
    }

    // ---- storage -----------------------------------------------------

    /// Write a value under `name`/`key`.
    ///
    /// Storage is keyed independently of account registration.
    pub fn put(&mut self, name: &Name, key: &str, value: Vec<u8>) {
        let slot = self.storage.entry(name.clone()).or_default();
        let prev = slot.insert(key.to_string(), value);
        self.journal.push(JournalEntry::StorageChanged {
            name: name.clone(),
            key: key.to_string(),
            prev,
        });
    }

    /// Read a value under `name`/`key`.
    pub fn get(&self, name: &Name, key: &str) -> Option<Vec<u8>> {
        self.storage.get(name).and_then(|slot| slot.get(key)).cloned()
    }

    // ---- logs --------------------------------------------------------

    /// Emit a log under the current execution context.
    pub fn add_log(&mut self, name: Name, topics: Vec<H256>, data: Vec<u8>) {
        let index = (self.logs.len() - self.tx_log_start) as u64;
        self.journal.push(JournalEntry::LogAdded);
        self.logs.push(Log {
            name,
            topics,
            data,
            block_number: 0,
            block_hash: self.block_hash,
            tx_hash: self.tx_hash,
            index,
            action_index: 0,
            tx_index: self.tx_index,
        });
    }

    /// All logs emitted against this state.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Logs emitted since the last `prepare`.
    pub fn tx_logs(&self) -> &[Log] {
        self.logs.get(self.tx_log_start..).unwrap_or(&[])
    }

    /// The in-block index set by the last `prepare`.
    pub fn tx_index(&self) -> u64 {
        self.tx_index
    }

    /// Mutable access to emitted logs, for post-seal block-hash stamping.
    pub fn logs_mut(&mut self) -> &mut [Log] {
        &mut self.logs
    }

    // ---- savepoints --------------------------------------------------

    /// Take a savepoint and return its id.
    pub fn snapshot(&mut self) -> usize {
        let id = self.next_revision_id;
        self.next_revision_id += 1;
        self.revisions.push(Revision {
            id,
            journal_len: self.journal.len(),
        });
        id
    }

    /// Revert to the savepoint `id`, discarding it and every savepoint
    /// taken after it.
    ///
    /// Unknown ids (already reverted or never issued) are ignored with
    /// an error log; state is left untouched.
    pub fn revert_to_snapshot(&mut self, id: usize) {
        let Some(pos) = self.revisions.iter().position(|r| r.id == id) else {
            error!(id, "[mc-state] revert to unknown savepoint ignored");
            return;
        };
        let target_len = self.revisions[pos].journal_len;
        while self.journal.len() > target_len {
            // Pop cannot fail: len > target_len >= 0.
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        self.revisions.truncate(pos);
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::AccountCreated { name } => {
                self.accounts.remove(&name);
            }
            JournalEntry::NonceChanged { name, prev } => {
                if let Some(account) = self.accounts.get_mut(&name) {
                    account.nonce = prev;
                }
            }
            JournalEntry::BalanceChanged { name, prev } => {
                if let Some(account) = self.accounts.get_mut(&name) {
                    account.balance = prev;
                }
            }
            JournalEntry::AuthorAdded { name } => {
                if let Some(account) = self.accounts.get_mut(&name) {
                    account.authors.pop();
                }
            }
            JournalEntry::StorageChanged { name, key, prev } => {
                let slot = self.storage.entry(name).or_default();
                match prev {
                    Some(value) => {
                        slot.insert(key, value);
                    }
                    None => {
                        slot.remove(&key);
                    }
                }
            }
            JournalEntry::LogAdded => {
                self.logs.pop();
            }
        }
    }

    // ---- commit ------------------------------------------------------

    /// The root the state would commit to right now.
    pub fn root_hash(&self) -> H256 {
        keccak256(&self.canonical_bytes())
    }

    /// Persist the state and return its root.
    ///
    /// `block_hash` and `number` record which block produced this state.
    /// The journal and all savepoints are discarded: committed effects
    /// are final.
    pub fn commit(&mut self, block_hash: H256, number: u64) -> Result<H256> {
        let bytes = self.canonical_bytes();
        let root = keccak256(&bytes);
        self.db.batch_put(vec![
            (state_key(root), bytes),
            (
                format!("state-block:{root:?}").into_bytes(),
                serde_json::to_vec(&(block_hash, number))
                    .map_err(|e| StateError::Codec(e.to_string()))?,
            ),
        ]);
        self.journal.clear();
        self.revisions.clear();
        self.origin_root = root;
        Ok(root)
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let blob = StateBlob {
            accounts: self.accounts.clone().into_iter().collect(),
            storage: self.storage.clone().into_iter().collect(),
        };
        // Serialization of in-memory maps cannot fail.
        serde_json::to_vec(&blob).unwrap_or_default()
    }
}

fn state_key(root: H256) -> Vec<u8> {
    let mut key = STATE_KEY_PREFIX.to_vec();
    key.extend_from_slice(root.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> StateDb {
        StateDb::open(Arc::new(MemoryDb::new()), H256::zero()).unwrap()
    }

    fn name(s: &str) -> Name {
        Name::new(s)
    }

    #[test]
    fn test_account_lifecycle() {
        let mut state = fresh();
        let alice = name("alice");
        state.create_account(&alice, vec![1; 33]).unwrap();
        assert_eq!(state.nonce(&alice).unwrap(), 0);

        state.add_balance(&alice, U256::from(100)).unwrap();
        state.sub_balance(&alice, U256::from(40)).unwrap();
        assert_eq!(state.balance(&alice).unwrap(), U256::from(60));

        state.inc_nonce(&alice).unwrap();
        assert_eq!(state.nonce(&alice).unwrap(), 1);
    }

    #[test]
    fn test_sub_balance_underflow() {
        let mut state = fresh();
        let alice = name("alice");
        state.create_account(&alice, vec![1; 33]).unwrap();
        state.add_balance(&alice, U256::from(10)).unwrap();
        assert_eq!(
            state.sub_balance(&alice, U256::from(11)),
            Err(StateError::BalanceUnderflow(alice.clone()))
        );
        assert_eq!(state.balance(&alice).unwrap(), U256::from(10));
    }

    #[test]
    fn test_revert_restores_every_touched_field() {
        let mut state = fresh();
        let alice = name("alice");
        let bob = name("bob");
        state.create_account(&alice, vec![1; 33]).unwrap();
        state.add_balance(&alice, U256::from(50)).unwrap();
        state.put(&alice, "color", b"red".to_vec());

        let snap = state.snapshot();

        state.create_account(&bob, vec![2; 33]).unwrap();
        state.add_balance(&bob, U256::from(7)).unwrap();
        state.sub_balance(&alice, U256::from(20)).unwrap();
        state.inc_nonce(&alice).unwrap();
        state.put(&alice, "color", b"blue".to_vec());
        state.put(&alice, "shape", b"round".to_vec());
        state.add_log(alice.clone(), vec![], b"event".to_vec());

        state.revert_to_snapshot(snap);

        assert!(!state.account_exists(&bob));
        assert_eq!(state.balance(&alice).unwrap(), U256::from(50));
        assert_eq!(state.nonce(&alice).unwrap(), 0);
        assert_eq!(state.get(&alice, "color"), Some(b"red".to_vec()));
        assert_eq!(state.get(&alice, "shape"), None);
        assert!(state.logs().is_empty());
    }

    #[test]
    fn test_revert_discards_later_savepoints() {
        let mut state = fresh();
        let alice = name("alice");
        state.create_account(&alice, vec![1; 33]).unwrap();

        let outer = state.snapshot();
        state.add_balance(&alice, U256::from(1)).unwrap();
        let inner = state.snapshot();
        state.add_balance(&alice, U256::from(2)).unwrap();

        state.revert_to_snapshot(outer);
        assert_eq!(state.balance(&alice).unwrap(), U256::zero());

        // `inner` was discarded by the outer revert; this is a no-op.
        state.add_balance(&alice, U256::from(9)).unwrap();
        state.revert_to_snapshot(inner);
        assert_eq!(state.balance(&alice).unwrap(), U256::from(9));
    }

    #[test]
    fn test_randomized_revert_matches_model() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        let mut state = fresh();
        let accounts: Vec<Name> = (0..4).map(|i| name(&format!("acct{i}"))).collect();
        for acct in &accounts {
            state.create_account(acct, vec![0; 33]).unwrap();
            state.add_balance(acct, U256::from(1000)).unwrap();
        }

        for _ in 0..50 {
            // Model: balances and nonces captured before the savepoint.
            let model: Vec<(U256, u64)> = accounts
                .iter()
                .map(|a| (state.balance(a).unwrap(), state.nonce(a).unwrap()))
                .collect();
            let snap = state.snapshot();

            for _ in 0..rng.gen_range(1..10) {
                let acct = &accounts[rng.gen_range(0..accounts.len())];
                match rng.gen_range(0..3) {
                    0 => state.add_balance(acct, U256::from(rng.gen_range(1..50u64))).unwrap(),
                    1 => {
                        let _ = state.sub_balance(acct, U256::from(rng.gen_range(1..50u64)));
                    }
                    _ => state.inc_nonce(acct).unwrap(),
                }
            }

            state.revert_to_snapshot(snap);
            for (acct, (balance, nonce)) in accounts.iter().zip(&model) {
                assert_eq!(state.balance(acct).unwrap(), *balance);
                assert_eq!(state.nonce(acct).unwrap(), *nonce);
            }
        }
    }

    #[test]
    fn test_commit_and_reopen() {
        let db = Arc::new(MemoryDb::new());
        let mut state = StateDb::open(Arc::clone(&db), H256::zero()).unwrap();
        let alice = name("alice");
        state.create_account(&alice, vec![1; 33]).unwrap();
        state.add_balance(&alice, U256::from(5)).unwrap();
        state.put(&alice, "k", vec![0x31]);

        let root = state.commit(H256::zero(), 0).unwrap();

        let reopened = StateDb::open(db, root).unwrap();
        assert_eq!(reopened.balance(&alice).unwrap(), U256::from(5));
        assert_eq!(reopened.get(&alice, "k"), Some(vec![0x31]));
        assert_eq!(reopened.root_hash(), root);
    }

    #[test]
    fn test_open_unknown_root() {
        let db = Arc::new(MemoryDb::new());
        let missing = keccak256(b"nope");
        assert_eq!(
            StateDb::open(db, missing).err(),
            Some(StateError::StateNotFound(missing))
        );
    }

    #[test]
    fn test_log_context() {
        let mut state = fresh();
        let tx = keccak256(b"tx");
        state.prepare(tx, H256::zero(), 3);
        state.add_log(name("alice"), vec![], vec![]);
        state.add_log(name("alice"), vec![], vec![]);
        assert_eq!(state.logs()[0].tx_hash, tx);
        assert_eq!(state.logs()[0].tx_index, 3);
        assert_eq!(state.logs()[0].index, 0);
        assert_eq!(state.logs()[1].index, 1);
    }
}
