//! Transactions and actions.
//!
//! A transaction carries a gas price (its priority in the ordering
//! queue) and one or more actions. The first action is primary: its
//! sender, nonce, and type drive ordering, candidacy filtering, and
//! execution.

use crate::hash::canonical_hash;
use crate::name::Name;
use primitive_types::{H256, U256};
use serde::{Deserialize, Serialize};

/// The kind of an action.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    /// Ordinary value transfer.
    Transfer,

    /// Governance: remove a misbehaving candidate from the schedule.
    /// Only accepted into a block produced by the system account.
    KickedCandidate,

    /// Governance: end a system take-over and return block production
    /// to the candidate schedule. Only accepted into a block produced
    /// by the system account.
    ExitTakeOver,
}

impl ActionType {
    /// Whether this kind may only be included by the system producer.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Self::KickedCandidate | Self::ExitTakeOver)
    }
}

/// A single action within a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Action kind.
    pub kind: ActionType,

    /// Sending account.
    pub sender: Name,

    /// Receiving account.
    pub recipient: Name,

    /// Sender nonce this action consumes.
    pub nonce: u64,

    /// Maximum gas the action may spend.
    pub gas_limit: u64,

    /// Value transferred to the recipient.
    pub value: U256,

    /// Opaque payload (governance actions name their subject here).
    pub payload: Vec<u8>,
}

/// A priced transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Gas price: the ranking key in the ordering queue.
    pub gas_price: U256,

    /// Actions, primary first. Never empty.
    pub actions: Vec<Action>,
}

impl Transaction {
    /// Create a single-action transaction.
    pub fn new(gas_price: U256, action: Action) -> Self {
        Self {
            gas_price,
            actions: vec![action],
        }
    }

    /// The primary action.
    pub fn primary(&self) -> &Action {
        // Invariant: actions is never empty (enforced at construction).
        &self.actions[0]
    }

    /// Sender of the primary action.
    pub fn sender(&self) -> &Name {
        &self.primary().sender
    }

    /// Nonce of the primary action.
    pub fn nonce(&self) -> u64 {
        self.primary().nonce
    }

    /// Stable content hash.
    pub fn hash(&self) -> H256 {
        canonical_hash(self)
    }
}
