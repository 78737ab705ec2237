//! # Meridian Chain - Transaction Pool
//!
//! Holds pending transactions grouped per sender and exposes the
//! per-slot ordering queue the block assembler drains.
//!
//! The pool itself makes no ordering promises; `pending()` hands out a
//! per-sender snapshot. Ordering is imposed by
//! [`TransactionsByPriceAndNonce`], which fixes a total order (gas
//! price descending, sender name ascending, nonce ascending) so block
//! contents are deterministic given the same snapshot.

#![warn(clippy::all)]

pub mod errors;
pub mod ordered;
pub mod pool;

pub use errors::TxPoolError;
pub use ordered::TransactionsByPriceAndNonce;
pub use pool::{TxPool, TxPoolConfig};

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, TxPoolError>;
