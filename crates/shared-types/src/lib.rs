//! # Meridian Chain - Shared Types
//!
//! Core entities shared by every subsystem: account names, block headers,
//! transactions, receipts, logs, and the block gas pool.
//!
//! These types are deliberately free of behaviour beyond construction,
//! canonical encoding, and hashing. Consensus rules live in `mc-dpos`,
//! execution rules in `mc-chain`; this crate only fixes the shapes and
//! the canonical byte representation they agree on.
//!
//! ## Canonical encoding
//!
//! Hashes (block, transaction, receipt root) are Keccak-256 over the
//! canonical `serde_json` encoding of the value. JSON struct fields
//! serialize in declaration order, so the encoding is deterministic for
//! a given type definition.

#![warn(clippy::all)]

pub mod block;
pub mod errors;
pub mod gas;
pub mod hash;
pub mod name;
pub mod params;
pub mod receipt;
pub mod transaction;

pub use block::{Block, BlockHeader};
pub use errors::TxError;
pub use gas::GasPool;
pub use hash::{canonical_hash, keccak256};
pub use name::Name;
pub use receipt::{Log, Receipt};
pub use transaction::{Action, ActionType, Transaction};

// Re-exported so downstream crates agree on one version.
pub use primitive_types::{H256, U256};
