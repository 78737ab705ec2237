//! The worker: slot scheduler and block assembler.
//!
//! Two long-lived loops cooperate around at most one in-flight
//! assembly attempt:
//!
//! - the **head-event loop** lives for the worker's lifetime and
//!   cancels the in-flight attempt when a block produced by someone
//!   else arrives;
//! - the **slot loop** lives while mining is active, wakes at every
//!   slot boundary, and performs `cancel -> join -> spawn` strictly in
//!   that order.
//!
//! The two conditions are independent: time advances whether or not
//! the network is live, so folding the loops into one queue would hide
//! that ordering. Cancellation is cooperative and single-shot; the
//! assembler polls its token at the top of the transaction-commit loop
//! and between phases, and a cancelled attempt publishes nothing.

use crate::config::MinerConfig;
use crate::error::{MinerError, Result};
use crate::metrics::Metrics;
use crate::ports::{ChainPort, PendingPort};
use crate::signer::CoinbaseSigner;
use k256::ecdsa::SigningKey;
use mc_dpos::Engine;
use mc_state::StateDb;
use mc_txpool::TransactionsByPriceAndNonce;
use parking_lot::{Mutex, RwLock};
use primitive_types::H256;
use shared_bus::{ChainEvent, EventFilter, EventPublisher, EventTopic, InMemoryEventBus};
use shared_types::params::{ACTION_GAS, BLOCK_GAS_LIMIT};
use shared_types::{Block, BlockHeader, GasPool, Receipt, Transaction, TxError};
use shared_types::Name;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Producer identity, guarded as one unit so a snapshot is always
/// internally consistent.
#[derive(Clone, Default)]
struct ProducerIdentity {
    coinbase: Name,
    priv_keys: Vec<SigningKey>,
    pub_keys: Vec<Vec<u8>>,
    extra: Vec<u8>,
    delay_ms: u64,
}

/// Per-attempt mutable context.
struct Work {
    header: BlockHeader,
    state: StateDb,
    txs: Vec<Transaction>,
    receipts: Vec<Receipt>,
    gas_pool: GasPool,
    counter: u64,
    token: CancellationToken,
}

/// The block producer.
pub struct Worker {
    engine: Arc<dyn Engine>,
    chain: Arc<dyn ChainPort>,
    pool: Arc<dyn PendingPort>,
    bus: Arc<InMemoryEventBus>,

    ident: Mutex<ProducerIdentity>,

    /// 0 = idle, 1 = active. CAS transitions so concurrent start/stop
    /// compose to exactly one effective change.
    mining: AtomicI32,
    force: AtomicBool,

    /// The single in-flight attempt's cancel handle. Readers: the
    /// head-event loop. Writer: the slot loop and the attempt itself.
    inflight: RwLock<Option<CancellationToken>>,

    /// Quit handle of the currently running slot loop.
    quit: Mutex<Option<CancellationToken>>,

    metrics: Arc<Metrics>,
}

impl Worker {
    /// Create a worker and spawn its head-event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        engine: Arc<dyn Engine>,
        chain: Arc<dyn ChainPort>,
        pool: Arc<dyn PendingPort>,
        bus: Arc<InMemoryEventBus>,
        config: MinerConfig,
    ) -> Arc<Self> {
        let worker = Arc::new(Self {
            engine,
            chain,
            pool,
            bus,
            ident: Mutex::new(ProducerIdentity {
                extra: config.extra,
                delay_ms: config.delay_ms,
                ..Default::default()
            }),
            mining: AtomicI32::new(0),
            force: AtomicBool::new(false),
            inflight: RwLock::new(None),
            quit: Mutex::new(None),
            metrics: Arc::new(Metrics::new()),
        });
        tokio::spawn(Arc::clone(&worker).update());
        worker
    }

    /// Begin producing blocks. No-op (with a warning) if already
    /// active.
    pub fn start(self: &Arc<Self>, force: bool) {
        if self
            .mining
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("[mc-miner] worker already started");
            return;
        }
        self.force.store(force, Ordering::SeqCst);
        let quit = CancellationToken::new();
        *self.quit.lock() = Some(quit.clone());
        tokio::spawn(Arc::clone(self).slot_loop(quit));
    }

    /// Stop producing blocks. No-op (with a warning) if already idle.
    pub fn stop(&self) {
        if self
            .mining
            .compare_exchange(1, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("[mc-miner] worker already stopped");
            return;
        }
        if let Some(quit) = self.quit.lock().take() {
            quit.cancel();
        }
    }

    /// Whether the worker is actively mining.
    pub fn mining(&self) -> bool {
        self.mining.load(Ordering::SeqCst) == 1
    }

    /// Install the producer identity: coinbase name and signing keys.
    ///
    /// Public keys are derived from the private keys and logged so the
    /// operator can check them against the account's registered
    /// authors.
    pub fn set_coinbase(&self, name: Name, priv_keys: Vec<SigningKey>) {
        let mut ident = self.ident.lock();
        ident.coinbase = name.clone();
        ident.pub_keys = priv_keys
            .iter()
            .enumerate()
            .map(|(index, key)| {
                let pub_key = key.verifying_key().to_sec1_bytes().to_vec();
                info!(
                    coinbase = %name,
                    index,
                    pubkey = %hex::encode(&pub_key),
                    "[mc-miner] set coinbase"
                );
                pub_key
            })
            .collect();
        ident.priv_keys = priv_keys;
    }

    /// Set the extra data stamped into produced headers.
    pub fn set_extra(&self, extra: Vec<u8>) {
        self.ident.lock().extra = extra;
    }

    /// Set the artificial post-persist announcement delay.
    pub fn set_delay_duration(&self, delay_ms: u64) {
        self.ident.lock().delay_ms = delay_ms;
    }

    /// The worker's production counters.
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Head-event loop: lives for the worker's lifetime.
    async fn update(self: Arc<Self>) {
        let mut sub = self
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::ChainHead]));
        while let Some(event) = sub.recv().await {
            if self.mining.load(Ordering::SeqCst) == 0 {
                continue;
            }
            let ChainEvent::ChainHead(block) = event else {
                continue;
            };
            let ours = self.ident.lock().coinbase.clone();
            if block.coinbase() != &ours {
                let stale = self.inflight.write().take();
                if let Some(token) = stale {
                    debug!("[mc-miner] old parent hash coming, will be closing current work");
                    token.cancel();
                    self.metrics.record_head_cancel();
                }
            }
        }
    }

    /// Slot loop: lives while mining is active.
    async fn slot_loop(self: Arc<Self>, quit: CancellationToken) {
        let interval = self.engine.block_interval();
        let mut attempt: Option<JoinHandle<()>> = None;
        loop {
            let now = now_ns();
            let target = now - now % interval + interval;
            tokio::select! {
                _ = quit.cancelled() => break,
                _ = sleep_until_wall(target) => {}
            }

            // Cancellation always precedes spawning of a replacement:
            // cancel, join, then spawn, never interleaved.
            let stale = self.inflight.write().take();
            if let Some(token) = stale {
                debug!("[mc-miner] next time coming, will be closing current work");
                token.cancel();
                self.metrics.record_slot_cancel();
            }
            if let Some(handle) = attempt.take() {
                let _ = handle.await;
            }

            let token = CancellationToken::new();
            *self.inflight.write() = Some(token.clone());
            let timestamp = self.engine.slot(now_ns());
            attempt = Some(tokio::spawn(Arc::clone(&self).mint_block(timestamp, token)));
        }
        // Mining is already flagged idle; any in-flight attempt will
        // finish as a local, unpublished block.
    }

    /// One slot's production attempt.
    async fn mint_block(self: Arc<Self>, timestamp: u64, token: CancellationToken) {
        let started = Instant::now();
        debug!(timestamp, "[mc-miner] mint block");
        loop {
            if token.is_cancelled() {
                break;
            }

            let parent = self.chain.current_header();
            match self.commit_new_work(timestamp, parent, &token).await {
                Ok(block) => {
                    if !block.header.sign.is_empty() {
                        info!(
                            candidate = %block.coinbase(),
                            number = block.number(),
                            hash = %block.hash(),
                            time = block.header.timestamp,
                            txs = block.transactions.len(),
                            gas = block.header.gas_used,
                            diff = %block.header.difficulty,
                            elapsed = ?started.elapsed(),
                            "[mc-miner] mined new block"
                        );
                        self.metrics
                            .record_block_mined(block.transactions.len() as u64);
                    }
                    break;
                }
                Err(err) if err.is_cancelled() => {
                    debug!(timestamp, "[mc-miner] mined block missing --- signal");
                    break;
                }
                Err(err) if err.is_wait() => {
                    warn!(timestamp, %err, "[mc-miner] failed to mint block");
                    sleep_until_wall(now_ns() + self.engine.block_interval() / 10).await;
                }
                Err(MinerError::Consensus(err)) => {
                    // Four sentinels point at operator misconfiguration
                    // and deserve attention; the rest is a slot that
                    // simply is not ours.
                    if err.is_misconfiguration() {
                        let candidate = self.ident.lock().coinbase.clone();
                        warn!(timestamp, %candidate, %err, "[mc-miner] failed to mint the block");
                    } else {
                        debug!(timestamp, %err, "[mc-miner] failed to mint the block");
                    }
                    break;
                }
                Err(err) if err.is_bad_slot() => {
                    self.metrics.record_attempt_failed();
                    error!(timestamp, %err, "[mc-miner] failed to mint block");
                    break;
                }
                Err(err) => {
                    self.metrics.record_attempt_failed();
                    warn!(timestamp, %err, "[mc-miner] failed to mint block");
                    break;
                }
            }
        }
        *self.inflight.write() = None;
    }

    /// Assemble, and if still mining seal/persist/announce, one block
    /// for `timestamp` on top of `parent`.
    async fn commit_new_work(
        &self,
        timestamp: u64,
        parent: BlockHeader,
        token: &CancellationToken,
    ) -> Result<Block> {
        let interval = self.engine.block_interval();
        let now = now_ns();
        if now >= timestamp.saturating_add(interval) {
            return Err(MinerError::SlotExpired {
                slot: timestamp,
                now,
            });
        }
        if parent.timestamp >= timestamp {
            return Err(MinerError::StaleParent {
                parent: parent.timestamp,
                slot: timestamp,
            });
        }
        // A gap behind us, and we are still early in our own slot: the
        // previous producer's block may arrive any moment.
        if parent.number > 0
            && parent.timestamp + interval < timestamp
            && now as i64 - timestamp as i64 <= (2 * interval / 5) as i64
        {
            return Err(MinerError::WaitParent);
        }

        let state = self.chain.state_at(parent.root)?;
        let ident = self.ident.lock().clone();

        // Candidacy is judged under the fork ruleset active in the
        // parent state.
        let mut probe = BlockHeader::default();
        self.chain.fill_fork_id(&mut probe, &state)?;
        self.engine
            .is_valid_candidate(
                &parent,
                timestamp,
                &ident.coinbase,
                &ident.pub_keys,
                &state,
                self.force.load(Ordering::SeqCst),
                probe.fork_id,
            )
            .map_err(MinerError::Consensus)?;

        let mut header = BlockHeader {
            parent_hash: parent.hash(),
            number: parent.number + 1,
            gas_limit: BLOCK_GAS_LIMIT,
            gas_used: 0,
            extra: ident.extra.clone(),
            timestamp,
            difficulty: self.engine.calc_difficulty(timestamp, &parent),
            coinbase: ident.coinbase.clone(),
            proposed_irreversible: self.engine.calc_proposed_irreversible(&parent, false),
            fork_id: 0,
            root: H256::zero(),
            receipts_root: H256::zero(),
            sign: Vec::new(),
        };

        self.chain.fill_fork_id(&mut header, &state)?;
        self.engine.prepare(&mut header, &parent, &state)?;

        let mut work = Work {
            gas_pool: GasPool::new(header.gas_limit),
            header,
            state,
            txs: Vec::new(),
            receipts: Vec::new(),
            counter: 0,
            token: token.clone(),
        };

        let fetch_started = Instant::now();
        let pending = self.pool.pending().await?;
        let pending_len: usize = pending.values().map(Vec::len).sum();
        debug!(
            len = pending_len,
            elapsed = ?fetch_started.elapsed(),
            "[mc-miner] got pending transactions from txpool"
        );

        let mut queue = TransactionsByPriceAndNonce::new(pending);
        self.commit_transactions(&mut work, &mut queue, interval).await;

        if work.token.is_cancelled() {
            return Err(MinerError::Cancelled);
        }

        if self.mining.load(Ordering::SeqCst) == 1 {
            let block = self
                .chain
                .finalize(&work.header, &work.txs, &work.receipts, &work.state)?;
            let signer = CoinbaseSigner::new(ident.priv_keys.clone(), ident.pub_keys.clone());
            let sealed = self.engine.seal(block, &signer, &work.state)?;

            // The block hash is only known now; stamp it onto every
            // receipt log and every pending state log.
            let hash = sealed.hash();
            for receipt in &mut work.receipts {
                for log in &mut receipt.logs {
                    log.block_hash = hash;
                }
            }
            for log in work.state.logs_mut() {
                log.block_hash = hash;
            }

            self.chain
                .write_block_with_state(&sealed, &work.receipts, &mut work.state)
                .await?;

            if ident.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(ident.delay_ms)).await;
            }

            let shared = Arc::new(sealed.clone());
            self.bus
                .publish(ChainEvent::ChainHead(Arc::clone(&shared)))
                .await;
            self.bus.publish(ChainEvent::NewMined(shared)).await;
            return Ok(sealed);
        }

        // Mining went idle during assembly: hand back the local block,
        // unsealed and unpublished.
        Ok(Block::new(work.header, work.txs))
    }

    /// Drain the ordering queue into the work under gas and time
    /// budgets.
    async fn commit_transactions(
        &self,
        work: &mut Work,
        queue: &mut TransactionsByPriceAndNonce,
        interval: u64,
    ) {
        let sys_name = self.chain.sys_name();
        loop {
            if work.token.is_cancelled() {
                debug!(
                    timestamp = work.header.timestamp,
                    "[mc-miner] mined block missing --- signal"
                );
                return;
            }
            if work.gas_pool.gas() < ACTION_GAS {
                debug!(
                    have = work.gas_pool.gas(),
                    want = ACTION_GAS,
                    "[mc-miner] not enough gas for further transactions"
                );
                break;
            }
            if interval != u64::MAX
                && now_ns() + 2 * interval / 5 >= work.header.timestamp + interval
            {
                debug!(
                    timestamp = work.header.timestamp,
                    "[mc-miner] not enough time for further transactions"
                );
                break;
            }

            let tx = match queue.peek() {
                Some(next) => next.clone(),
                None => break,
            };

            // Governance actions ride only in system-produced blocks.
            // Skip, don't drop: the sender's later ordinary
            // transactions stay eligible.
            if work.header.coinbase != sys_name && tx.primary().kind.is_privileged() {
                queue.shift();
                continue;
            }

            let sender = tx.sender().clone();
            let nonce = tx.nonce();
            work.state.prepare(tx.hash(), H256::zero(), work.counter);

            match self.commit_transaction(work, &tx).await {
                Ok(()) => {
                    work.counter += 1;
                    queue.shift();
                }
                Err(TxError::GasLimitReached) => {
                    // This sender's next transaction cannot be cheaper;
                    // drop the sender for the rest of the block.
                    trace!(%sender, "[mc-miner] gas limit exceeded for current block");
                    queue.pop();
                }
                Err(TxError::NonceTooLow { .. }) => {
                    // Pool/head race: the nonce was consumed by an
                    // earlier block. Try the sender's next one.
                    trace!(%sender, nonce, "[mc-miner] skipping transaction with low nonce");
                    queue.shift();
                }
                Err(TxError::NonceTooHigh { .. }) => {
                    // A gap: nothing from this sender can apply now.
                    trace!(%sender, nonce, "[mc-miner] skipping account with high nonce");
                    queue.pop();
                }
                Err(err) => {
                    debug!(hash = %tx.hash(), %err, "[mc-miner] transaction failed, account skipped");
                    queue.shift();
                }
            }
        }
    }

    /// Apply one transaction inside a savepoint.
    async fn commit_transaction(
        &self,
        work: &mut Work,
        tx: &Transaction,
    ) -> std::result::Result<(), TxError> {
        let snap = work.state.snapshot();
        match self
            .chain
            .apply_transaction(
                Some(&work.header.coinbase),
                &mut work.gas_pool,
                &mut work.state,
                &work.header,
                tx,
            )
            .await
        {
            Ok((receipt, gas_used)) => {
                work.header.gas_used += gas_used;
                work.txs.push(tx.clone());
                work.receipts.push(receipt);
                Ok(())
            }
            Err(err) => {
                work.state.revert_to_snapshot(snap);
                Err(err)
            }
        }
    }
}

/// Current wall clock in Unix nanoseconds.
pub(crate) fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Sleep until the wall clock reaches `target_ns`.
///
/// Backed by the runtime's monotonic timer; the loop re-checks the
/// wall clock so the contract "fires no earlier than the target"
/// survives timer coarseness and clock adjustments.
pub(crate) async fn sleep_until_wall(target_ns: u64) {
    loop {
        let now = now_ns();
        if now >= target_ns {
            return;
        }
        tokio::time::sleep(Duration::from_nanos(target_ns - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MinerError;
    use async_trait::async_trait;
    use mc_chain::{Blockchain, ChainConfig, GenesisAccount};
    use mc_dpos::{Dpos, DposConfig};
    use mc_state::MemoryDb;
    use mc_txpool::{TxPool, TxPoolConfig};
    use shared_types::{Action, ActionType, U256};
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::AtomicUsize;

    /// Long enough that a test never crosses a slot boundary mid-run.
    const TEST_INTERVAL_MS: u64 = 600_000;

    /// Deterministic per-name signing key, so two environments built
    /// from the same names share a genesis byte-for-byte.
    fn key_for(name: &str) -> SigningKey {
        let digest = shared_types::keccak256(name.as_bytes());
        SigningKey::from_slice(digest.as_bytes()).expect("scalar from digest")
    }

    fn pub_for(name: &str) -> Vec<u8> {
        key_for(name).verifying_key().to_sec1_bytes().to_vec()
    }

    struct TestEnv {
        engine: Arc<Dpos>,
        chain: Arc<Blockchain>,
        pool: Arc<TxPool>,
        bus: Arc<InMemoryEventBus>,
        worker: Arc<Worker>,
    }

    fn env(validators: &[&str]) -> TestEnv {
        let engine = Arc::new(Dpos::new(DposConfig {
            block_interval_ms: TEST_INTERVAL_MS,
            validators: validators.iter().map(|v| Name::new(*v)).collect(),
            sys_name: Name::new("meridian.admin"),
            reversible_limit: 12,
        }));

        let mut names: BTreeSet<&str> = ["alice", "bob", "carol", "meridian.admin"].into();
        names.extend(validators);
        let accounts = names
            .into_iter()
            .map(|name| GenesisAccount {
                name: Name::new(name),
                balance: U256::from(1_000_000_000_000_000u64),
                author: pub_for(name),
            })
            .collect();

        let chain = Arc::new(
            Blockchain::new(
                ChainConfig {
                    chain_name: "testnet".to_string(),
                    sys_name: Name::new("meridian.admin"),
                    accounts,
                },
                &engine,
                Arc::new(MemoryDb::new()),
            )
            .expect("genesis"),
        );
        let pool = Arc::new(TxPool::new(TxPoolConfig {
            max_account_slots: 2048,
        }));
        let bus = Arc::new(InMemoryEventBus::new());
        let worker = Worker::new(
            Arc::clone(&engine) as Arc<dyn Engine>,
            Arc::clone(&chain) as Arc<dyn ChainPort>,
            Arc::clone(&pool) as Arc<dyn PendingPort>,
            Arc::clone(&bus),
            MinerConfig::default(),
        );
        TestEnv {
            engine,
            chain,
            pool,
            bus,
            worker,
        }
    }

    fn transfer(sender: &str, nonce: u64, price: u64) -> Transaction {
        Transaction::new(
            U256::from(price),
            Action {
                kind: ActionType::Transfer,
                sender: Name::new(sender),
                recipient: Name::new("carol"),
                nonce,
                gas_limit: 200_000,
                value: U256::from(1),
                payload: vec![],
            },
        )
    }

    fn governance(kind: ActionType, sender: &str, nonce: u64, subject: &str) -> Transaction {
        Transaction::new(
            U256::from(5),
            Action {
                kind,
                sender: Name::new(sender),
                recipient: Name::new("meridian.admin"),
                nonce,
                gas_limit: 300_000,
                value: U256::zero(),
                payload: serde_json::to_vec(&Name::new(subject)).expect("encode"),
            },
        )
    }

    /// The next slot boundary: always in the future, so preconditions
    /// and the drain time budget hold for the whole test.
    fn next_slot(env: &TestEnv) -> u64 {
        env.engine.slot(now_ns()) + env.engine.block_interval()
    }

    /// Run one assembly attempt as `coinbase`, sealing and publishing.
    /// `force` skips the schedule match so any candidate can produce.
    async fn mine(env: &TestEnv, coinbase: &str, timestamp: u64) -> Result<Block> {
        env.worker
            .set_coinbase(Name::new(coinbase), vec![key_for(coinbase)]);
        env.worker.mining.store(1, Ordering::SeqCst);
        env.worker.force.store(true, Ordering::SeqCst);
        let token = CancellationToken::new();
        let parent = env.chain.current_header();
        env.worker.commit_new_work(timestamp, parent, &token).await
    }

    fn included(block: &Block) -> Vec<(String, u64)> {
        block
            .transactions
            .iter()
            .map(|tx| (tx.sender().as_str().to_string(), tx.nonce()))
            .collect()
    }

    #[tokio::test]
    async fn test_mined_block_extends_parent() {
        let env = env(&["validator1"]);
        env.pool.add(transfer("alice", 0, 5)).unwrap();
        env.pool.add(transfer("alice", 1, 5)).unwrap();

        let ts = next_slot(&env);
        let parent = env.chain.current_header();
        let block = mine(&env, "validator1", ts).await.unwrap();

        assert_eq!(block.number(), parent.number + 1);
        assert_eq!(block.header.timestamp, ts);
        assert_eq!(block.header.parent_hash, parent.hash());
        assert_eq!(included(&block), vec![("alice".into(), 0), ("alice".into(), 1)]);
        assert!(block.header.gas_used <= block.header.gas_limit);
        assert!(!block.header.sign.is_empty());
        assert_eq!(env.chain.current_header().hash(), block.hash());
    }

    #[tokio::test]
    async fn test_sender_dropped_on_nonce_too_high() {
        let env = env(&["validator1"]);
        // Advance alice's on-chain nonce to 3.
        for nonce in 0..3 {
            env.pool.add(transfer("alice", nonce, 5)).unwrap();
        }
        let ts = next_slot(&env);
        let first = mine(&env, "validator1", ts).await.unwrap();
        assert_eq!(first.transactions.len(), 3);
        env.pool.prune_below(&Name::new("alice"), 3);

        // A nonce gap (5, 6 against chain nonce 3) drops alice on the
        // first peek; bob's transaction still lands.
        env.pool.add(transfer("alice", 5, 9)).unwrap();
        env.pool.add(transfer("alice", 6, 9)).unwrap();
        env.pool.add(transfer("bob", 0, 1)).unwrap();

        let second = mine(&env, "validator1", ts + env.engine.block_interval())
            .await
            .unwrap();
        assert_eq!(included(&second), vec![("bob".into(), 0)]);
    }

    #[tokio::test]
    async fn test_stale_nonce_shifted_not_dropped() {
        let env = env(&["validator1"]);
        for nonce in 0..3 {
            env.pool.add(transfer("alice", nonce, 5)).unwrap();
        }
        let ts = next_slot(&env);
        mine(&env, "validator1", ts).await.unwrap();
        env.pool.prune_below(&Name::new("alice"), 3);

        // nonce 2 is stale, nonce 3 is current: the stale one is
        // skipped and the valid one from the same sender is included.
        env.pool.add(transfer("alice", 2, 5)).unwrap();
        env.pool.add(transfer("alice", 3, 5)).unwrap();

        let block = mine(&env, "validator1", ts + env.engine.block_interval())
            .await
            .unwrap();
        assert_eq!(included(&block), vec![("alice".into(), 3)]);
    }

    #[tokio::test]
    async fn test_privileged_tx_skipped_for_ordinary_producer() {
        let env = env(&["validator1", "validator2"]);
        for nonce in 0..2 {
            env.pool.add(transfer("alice", nonce, 5)).unwrap();
        }
        let ts = next_slot(&env);
        mine(&env, "validator1", ts).await.unwrap();
        env.pool.prune_below(&Name::new("alice"), 2);

        // A governance action rides ahead of alice's ordinary
        // transfer. The producer is not the system account, so the
        // governance action is skipped with a shift; the transfer from
        // the same sender must still be included.
        env.pool
            .add(governance(ActionType::KickedCandidate, "alice", 1, "validator2"))
            .unwrap();
        env.pool.add(transfer("alice", 2, 5)).unwrap();

        let block = mine(&env, "validator1", ts + env.engine.block_interval())
            .await
            .unwrap();
        assert_eq!(included(&block), vec![("alice".into(), 2)]);

        // The schedule is untouched.
        let state = env.chain.state_at(env.chain.current_header().root).unwrap();
        assert!(env
            .engine
            .candidates(&state)
            .contains(&Name::new("validator2")));
    }

    #[tokio::test]
    async fn test_system_producer_executes_governance() {
        let env = env(&["validator1", "validator2"]);
        env.pool
            .add(governance(
                ActionType::KickedCandidate,
                "meridian.admin",
                0,
                "validator2",
            ))
            .unwrap();

        let block = mine(&env, "meridian.admin", next_slot(&env)).await.unwrap();
        assert_eq!(block.transactions.len(), 1);

        let state = env.chain.state_at(env.chain.current_header().root).unwrap();
        let candidates = env.engine.candidates(&state);
        assert!(!candidates.contains(&Name::new("validator2")));
        assert!(candidates.contains(&Name::new("validator1")));
    }

    /// Chain wrapper that fires a cancellation token after the n-th
    /// successful apply.
    struct CancelAfterChain {
        inner: Arc<Blockchain>,
        applied: Arc<AtomicUsize>,
        cancel_after: usize,
        token: CancellationToken,
    }

    #[async_trait]
    impl ChainPort for CancelAfterChain {
        fn current_header(&self) -> BlockHeader {
            self.inner.current_header()
        }

        fn sys_name(&self) -> Name {
            Blockchain::sys_name(&self.inner).clone()
        }

        fn state_at(&self, root: H256) -> Result<StateDb> {
            Ok(Blockchain::state_at(&self.inner, root)?)
        }

        fn fill_fork_id(&self, header: &mut BlockHeader, state: &StateDb) -> Result<()> {
            Ok(Blockchain::fill_fork_id(&self.inner, header, state)?)
        }

        async fn apply_transaction(
            &self,
            coinbase: Option<&Name>,
            pool: &mut GasPool,
            state: &mut StateDb,
            header: &BlockHeader,
            tx: &Transaction,
        ) -> std::result::Result<(Receipt, u64), TxError> {
            let result =
                Blockchain::apply_transaction(&self.inner, coinbase, pool, state, header, tx);
            if result.is_ok() {
                let applied = self.applied.fetch_add(1, Ordering::SeqCst) + 1;
                if applied == self.cancel_after {
                    self.token.cancel();
                }
            }
            result
        }

        fn finalize(
            &self,
            header: &BlockHeader,
            txs: &[Transaction],
            receipts: &[Receipt],
            state: &StateDb,
        ) -> Result<Block> {
            Ok(Blockchain::finalize(&self.inner, header, txs, receipts, state)?)
        }

        async fn write_block_with_state(
            &self,
            block: &Block,
            receipts: &[Receipt],
            state: &mut StateDb,
        ) -> Result<()> {
            Ok(Blockchain::write_block_with_state(&self.inner, block, receipts, state)?)
        }
    }

    #[tokio::test]
    async fn test_cancellation_mid_drain_publishes_nothing() {
        let base = env(&["validator1"]);
        for nonce in 0..1000 {
            base.pool.add(transfer("alice", nonce, 5)).unwrap();
        }

        let token = CancellationToken::new();
        let applied = Arc::new(AtomicUsize::new(0));
        let chain = Arc::new(CancelAfterChain {
            inner: Arc::clone(&base.chain),
            applied: Arc::clone(&applied),
            cancel_after: 10,
            token: token.clone(),
        });
        let worker = Worker::new(
            Arc::clone(&base.engine) as Arc<dyn Engine>,
            chain as Arc<dyn ChainPort>,
            Arc::clone(&base.pool) as Arc<dyn PendingPort>,
            Arc::clone(&base.bus),
            MinerConfig::default(),
        );
        worker.set_coinbase(Name::new("validator1"), vec![key_for("validator1")]);
        worker.mining.store(1, Ordering::SeqCst);

        let mut mined = base
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::NewMined]));

        let parent = base.chain.current_header();
        let result = worker
            .commit_new_work(next_slot(&base), parent, &token)
            .await;

        assert!(matches!(result, Err(MinerError::Cancelled)));
        assert_eq!(applied.load(Ordering::SeqCst), 10);
        assert!(matches!(mined.try_recv(), Ok(None)));
        assert_eq!(base.chain.current_header().number, 0);
    }

    #[tokio::test]
    async fn test_assembly_is_deterministic() {
        let env1 = env(&["validator1"]);
        let env2 = env(&["validator1"]);
        let txs = vec![
            transfer("alice", 0, 5),
            transfer("alice", 1, 7),
            transfer("bob", 0, 5),
            transfer("carol", 0, 9),
        ];
        for tx in &txs {
            env1.pool.add(tx.clone()).unwrap();
            env2.pool.add(tx.clone()).unwrap();
        }

        let ts = next_slot(&env1);
        let b1 = mine(&env1, "validator1", ts).await.unwrap();
        let b2 = mine(&env2, "validator1", ts).await.unwrap();

        assert_eq!(
            serde_json::to_vec(&b1).unwrap(),
            serde_json::to_vec(&b2).unwrap()
        );
    }

    #[tokio::test]
    async fn test_slot_expired() {
        let env = env(&["validator1"]);
        let interval = env.engine.block_interval();
        let past = env.engine.slot(now_ns()) - interval;
        let result = mine(&env, "validator1", past).await;
        assert!(matches!(result, Err(MinerError::SlotExpired { .. })));
    }

    #[tokio::test]
    async fn test_stale_parent() {
        let env = env(&["validator1"]);
        let ts = next_slot(&env);
        mine(&env, "validator1", ts).await.unwrap();
        // Same slot again: the parent now carries this timestamp.
        let result = mine(&env, "validator1", ts).await;
        assert!(matches!(result, Err(MinerError::StaleParent { .. })));
    }

    #[tokio::test]
    async fn test_wait_parent_is_soft() {
        let env = env(&["validator1"]);
        let interval = env.engine.block_interval();
        let ts = next_slot(&env);
        mine(&env, "validator1", ts).await.unwrap();

        // Two slots ahead of the parent while we are still early in
        // our own window: the previous block may yet arrive.
        let err = mine(&env, "validator1", ts + 2 * interval)
            .await
            .expect_err("the attempt should yield to the missing parent");
        assert!(matches!(err, MinerError::WaitParent));
        assert!(err.is_wait());
    }

    #[tokio::test]
    async fn test_exact_gas_fit_then_stop() {
        let env = env(&["validator1"]);
        env.worker
            .set_coinbase(Name::new("validator1"), vec![key_for("validator1")]);
        env.worker.mining.store(1, Ordering::SeqCst);

        let parent = env.chain.current_header();
        let state = env.chain.state_at(parent.root).unwrap();
        let header = BlockHeader {
            parent_hash: parent.hash(),
            number: 1,
            gas_limit: BLOCK_GAS_LIMIT,
            timestamp: next_slot(&env),
            coinbase: Name::new("validator1"),
            ..Default::default()
        };
        let mut work = Work {
            // Exactly one intrinsic-gas transaction fits.
            gas_pool: GasPool::new(ACTION_GAS),
            header,
            state,
            txs: Vec::new(),
            receipts: Vec::new(),
            counter: 0,
            token: CancellationToken::new(),
        };

        let mut pending: BTreeMap<Name, Vec<Transaction>> = BTreeMap::new();
        let mut tx0 = transfer("alice", 0, 5);
        tx0.actions[0].gas_limit = ACTION_GAS;
        let mut tx1 = transfer("alice", 1, 5);
        tx1.actions[0].gas_limit = ACTION_GAS;
        pending.insert(Name::new("alice"), vec![tx0, tx1]);
        let mut queue = TransactionsByPriceAndNonce::new(pending);

        env.worker
            .commit_transactions(&mut work, &mut queue, env.engine.block_interval())
            .await;

        assert_eq!(work.txs.len(), 1);
        assert_eq!(work.gas_pool.gas(), 0);
        // The second transaction is still queued; the drain stopped on
        // the gas floor, not on queue exhaustion.
        assert!(queue.peek().is_some());
    }

    #[tokio::test]
    async fn test_stopped_worker_returns_local_unsealed_block() {
        let env = env(&["validator1"]);
        env.pool.add(transfer("alice", 0, 5)).unwrap();
        env.worker
            .set_coinbase(Name::new("validator1"), vec![key_for("validator1")]);
        // mining stays 0: assembly may run (e.g. a stop raced the
        // attempt), but nothing is sealed or published.
        let token = CancellationToken::new();
        let parent = env.chain.current_header();
        let block = env
            .worker
            .commit_new_work(next_slot(&env), parent, &token)
            .await
            .unwrap();
        assert!(block.header.sign.is_empty());
        assert_eq!(env.chain.current_header().number, 0);
    }

    #[tokio::test]
    async fn test_start_stop_idempotence() {
        let env = env(&["validator1"]);
        env.worker.start(false);
        env.worker.start(false);
        assert!(env.worker.mining());

        env.worker.stop();
        assert!(!env.worker.mining());
        env.worker.stop();
        assert!(!env.worker.mining());
    }

    #[tokio::test]
    async fn test_repeated_cancel_is_noop() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_sleep_until_wall_never_fires_early() {
        let target = now_ns() + 50_000_000;
        sleep_until_wall(target).await;
        assert!(now_ns() >= target);
    }
}
