//! Error types for the chain layer.

use mc_state::StateError;
use primitive_types::H256;
use thiserror::Error;

/// Errors from chain construction and block persistence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// State access failed.
    #[error(transparent)]
    State(#[from] StateError),

    /// The block's parent is not the current head.
    #[error("block parent {parent:?} is not the current head {head:?}")]
    NotCanonicalHead {
        /// Parent hash carried by the block.
        parent: H256,
        /// Hash of the current head.
        head: H256,
    },

    /// The header's state root disagrees with the executed state.
    #[error("state root mismatch: header {header:?}, computed {computed:?}")]
    RootMismatch {
        /// Root claimed by the header.
        header: H256,
        /// Root computed from the state handle.
        computed: H256,
    },

    /// Genesis construction failed.
    #[error("genesis: {0}")]
    Genesis(String),
}
