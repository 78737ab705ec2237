//! # Meridian Chain - Chain Layer
//!
//! Owns the canonical chain: the head header, committed blocks and
//! receipts, and the executor that applies one transaction to a
//! mutable state fork.
//!
//! The block producer drives this layer through a narrow surface:
//! `current_header`, `state_at`, `fill_fork_id`, `apply_transaction`,
//! `finalize`, `write_block_with_state`. Fork choice is not
//! implemented; whatever extends the current head becomes the head.

#![warn(clippy::all)]

pub mod chain;
pub mod config;
pub mod errors;
pub mod executor;

pub use chain::Blockchain;
pub use config::{ChainConfig, GenesisAccount};
pub use errors::ChainError;
pub use executor::apply_transaction;

/// Result alias for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
