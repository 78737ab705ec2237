//! The engine trait and the DPoS implementation.

use crate::config::DposConfig;
use crate::errors::DposError;
use crate::signer::BlockSigner;
use crate::Result;
use k256::ecdsa::signature::Verifier;
use k256::ecdsa::{Signature, VerifyingKey};
use mc_state::StateDb;
use primitive_types::U256;
use shared_types::{Block, BlockHeader, Name};
use tracing::debug;

/// State storage key (under the system account) of the candidate
/// schedule, a canonical-encoded `Vec<Name>`.
pub const CANDIDATES_KEY: &str = "dpos.candidates";

/// State storage key of the system take-over flag.
pub const TAKEOVER_KEY: &str = "dpos.takeover";

/// State storage key of the active fork identifier.
pub const FORK_ID_KEY: &str = "dpos.forkid";

/// The consensus capability set the block producer drives.
pub trait Engine: Send + Sync {
    /// Protocol block interval in nanoseconds.
    fn block_interval(&self) -> u64;

    /// Floor a wall-clock instant to its slot timestamp.
    fn slot(&self, timestamp_ns: u64) -> u64;

    /// Whether `candidate` may produce the block for `slot_ts` on top
    /// of `parent`. `force` bypasses the schedule match only.
    #[allow(clippy::too_many_arguments)]
    fn is_valid_candidate(
        &self,
        parent: &BlockHeader,
        slot_ts: u64,
        candidate: &Name,
        pub_keys: &[Vec<u8>],
        state: &StateDb,
        force: bool,
        fork_id: u64,
    ) -> Result<()>;

    /// The irreversible block number a producer on top of `parent` may
    /// assert.
    fn calc_proposed_irreversible(&self, parent: &BlockHeader, stage: bool) -> u64;

    /// Difficulty of the block at `slot_ts` on top of `parent`.
    fn calc_difficulty(&self, slot_ts: u64, parent: &BlockHeader) -> U256;

    /// Validate and complete a freshly constructed header.
    fn prepare(&self, header: &mut BlockHeader, parent: &BlockHeader, state: &StateDb)
        -> Result<()>;

    /// Sign the block through the signer capability.
    fn seal(&self, block: Block, signer: &dyn BlockSigner, state: &StateDb) -> Result<Block>;

    /// Check a sealed header against the coinbase's registered keys.
    fn verify_seal(&self, header: &BlockHeader, state: &StateDb) -> Result<()>;

    /// The privileged system account.
    fn sys_name(&self) -> &Name;
}

/// The DPoS engine.
pub struct Dpos {
    config: DposConfig,
}

impl Dpos {
    /// Create an engine from configuration.
    pub fn new(config: DposConfig) -> Self {
        Self { config }
    }

    /// The engine configuration.
    pub fn config(&self) -> &DposConfig {
        &self.config
    }

    /// The active candidate schedule: the list stored in state under
    /// the system account, falling back to the configured genesis
    /// validators when none is stored.
    pub fn candidates(&self, state: &StateDb) -> Vec<Name> {
        state
            .get(&self.config.sys_name, CANDIDATES_KEY)
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_else(|| self.config.validators.clone())
    }

    /// Persist a candidate schedule into state.
    pub fn store_candidates(&self, state: &mut StateDb, candidates: &[Name]) {
        // Serializing a list of names cannot fail.
        let bytes = serde_json::to_vec(candidates).unwrap_or_default();
        state.put(&self.config.sys_name, CANDIDATES_KEY, bytes);
    }

    /// Whether the system take-over flag is set in state.
    pub fn takeover_active(&self, state: &StateDb) -> bool {
        state
            .get(&self.config.sys_name, TAKEOVER_KEY)
            .is_some_and(|flag| flag == b"1")
    }

    /// Set or clear the system take-over flag.
    pub fn set_takeover(&self, state: &mut StateDb, active: bool) {
        let flag = if active { b"1".to_vec() } else { b"0".to_vec() };
        state.put(&self.config.sys_name, TAKEOVER_KEY, flag);
    }

    /// The candidate scheduled for `slot_ts`.
    pub fn scheduled_candidate(&self, state: &StateDb, slot_ts: u64) -> Result<Name> {
        let candidates = self.candidates(state);
        if candidates.is_empty() {
            return Err(DposError::EmptySchedule);
        }
        let index = (slot_ts / self.block_interval()) as usize % candidates.len();
        Ok(candidates[index].clone())
    }
}

impl Engine for Dpos {
    fn block_interval(&self) -> u64 {
        self.config.block_interval_ns()
    }

    fn slot(&self, timestamp_ns: u64) -> u64 {
        timestamp_ns - timestamp_ns % self.block_interval()
    }

    fn is_valid_candidate(
        &self,
        parent: &BlockHeader,
        slot_ts: u64,
        candidate: &Name,
        pub_keys: &[Vec<u8>],
        state: &StateDb,
        force: bool,
        _fork_id: u64,
    ) -> Result<()> {
        let takeover = self.takeover_active(state);
        if takeover && candidate != &self.config.sys_name {
            return Err(DposError::SystemTakeOver);
        }
        if !candidate.is_valid() {
            return Err(DposError::IllegalCandidateName(candidate.clone()));
        }
        if pub_keys.is_empty()
            || pub_keys
                .iter()
                .any(|key| VerifyingKey::from_sec1_bytes(key).is_err())
        {
            return Err(DposError::IllegalCandidatePubKey);
        }
        let reversible = parent.number.saturating_sub(parent.proposed_irreversible);
        if reversible > self.config.reversible_limit {
            return Err(DposError::TooMuchReversible {
                reversible,
                limit: self.config.reversible_limit,
            });
        }
        // The system account owns every slot while a take-over is
        // active; the schedule only binds ordinary operation.
        if !force && !takeover {
            let scheduled = self.scheduled_candidate(state, slot_ts)?;
            if &scheduled != candidate {
                debug!(
                    %candidate,
                    %scheduled,
                    slot = slot_ts,
                    "[mc-dpos] slot belongs to another candidate"
                );
                return Err(DposError::NotOurTurn {
                    candidate: candidate.clone(),
                    slot: slot_ts,
                });
            }
        }
        Ok(())
    }

    fn calc_proposed_irreversible(&self, parent: &BlockHeader, _stage: bool) -> u64 {
        parent
            .proposed_irreversible
            .max(parent.number.saturating_sub(self.config.reversible_limit))
    }

    fn calc_difficulty(&self, slot_ts: u64, parent: &BlockHeader) -> U256 {
        // Slot distance from the parent: 1 when chained tightly, larger
        // when slots were missed. Deterministic in (parent, slot).
        let interval = self.block_interval();
        let parent_slot = self.slot(parent.timestamp);
        let distance = slot_ts.saturating_sub(parent_slot) / interval;
        U256::from(distance.max(1))
    }

    fn prepare(
        &self,
        header: &mut BlockHeader,
        parent: &BlockHeader,
        _state: &StateDb,
    ) -> Result<()> {
        if header.number != parent.number + 1 {
            return Err(DposError::InvalidHeader(format!(
                "number {} not parent {} + 1",
                header.number, parent.number
            )));
        }
        if header.timestamp <= parent.timestamp {
            return Err(DposError::InvalidHeader(format!(
                "timestamp {} not after parent {}",
                header.timestamp, parent.timestamp
            )));
        }
        if header.difficulty.is_zero() {
            header.difficulty = self.calc_difficulty(header.timestamp, parent);
        }
        Ok(())
    }

    fn seal(&self, mut block: Block, signer: &dyn BlockSigner, state: &StateDb) -> Result<Block> {
        let content = block.header.sig_hash();
        let signature = signer.sign(&block.header.coinbase, content.as_bytes(), state)?;
        if signature.is_empty() {
            return Err(DposError::Sign("empty signature".to_string()));
        }
        block.header.sign = signature;
        Ok(block)
    }

    fn verify_seal(&self, header: &BlockHeader, state: &StateDb) -> Result<()> {
        let signature =
            Signature::from_slice(&header.sign).map_err(|_| DposError::InvalidSeal)?;
        let content = header.sig_hash();
        let authors = state.authors(&header.coinbase)?;
        for author in authors {
            if let Ok(key) = VerifyingKey::from_sec1_bytes(author) {
                if key.verify(content.as_bytes(), &signature).is_ok() {
                    return Ok(());
                }
            }
        }
        Err(DposError::InvalidSeal)
    }

    fn sys_name(&self) -> &Name {
        &self.config.sys_name
    }
}
