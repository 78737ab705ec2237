//! Error types for the consensus engine.

use shared_types::Name;
use thiserror::Error;

/// Errors from candidacy validation, preparation, and sealing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DposError {
    /// The system account has taken over block production.
    #[error("system take over")]
    SystemTakeOver,

    /// Too many blocks are still reversible; production must pause
    /// until finality catches up.
    #[error("too much reversible blocks: {reversible}, limit {limit}")]
    TooMuchReversible {
        /// Blocks past the proposed-irreversible mark.
        reversible: u64,
        /// Configured reversible window.
        limit: u64,
    },

    /// The configured coinbase is not a valid account name.
    #[error("illegal candidate name: {0:?}")]
    IllegalCandidateName(Name),

    /// No usable public key is configured for the candidate.
    #[error("illegal candidate pubkey")]
    IllegalCandidatePubKey,

    /// Another candidate owns this slot.
    #[error("candidate {candidate} not scheduled for slot {slot}")]
    NotOurTurn {
        /// The candidate that asked.
        candidate: Name,
        /// The slot timestamp asked about.
        slot: u64,
    },

    /// No candidate schedule is available.
    #[error("empty candidate schedule")]
    EmptySchedule,

    /// A header violates a structural rule.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The signer produced no usable signature.
    #[error("sign: {0}")]
    Sign(String),

    /// The seal does not verify against the coinbase's author keys.
    #[error("invalid seal")]
    InvalidSeal,

    /// State access failed during a consensus check.
    #[error(transparent)]
    State(#[from] mc_state::StateError),
}

impl DposError {
    /// The four sentinels that indicate operator misconfiguration and
    /// are surfaced at warn level by the worker.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            Self::SystemTakeOver
                | Self::TooMuchReversible { .. }
                | Self::IllegalCandidateName(_)
                | Self::IllegalCandidatePubKey
        )
    }
}
