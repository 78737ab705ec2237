//! # Meridian Chain - World State
//!
//! The mutable account/storage state a block is executed against, plus
//! the two disciplines the block producer depends on:
//!
//! - **Savepoints**: [`StateDb::snapshot`] / [`StateDb::revert_to_snapshot`]
//!   give per-transaction isolation. They are backed by a journal of
//!   reversible operations and a generation counter, so a revert is a
//!   reverse replay of the journal tail rather than a copy of the state.
//! - **Timed chain snapshots**: [`SnapshotManager`] records committed
//!   state roots under a timestamp so historical state can be re-opened
//!   and queried after a reload.
//!
//! A `StateDb` is forked from a committed root with [`StateDb::open`]
//! and owned exclusively by whoever forked it; nothing here is shared
//! across tasks.

#![warn(clippy::all)]

pub mod account;
pub mod errors;
pub mod memory_db;
pub mod snapshot;
pub mod statedb;

pub use account::AccountManager;
pub use errors::StateError;
pub use memory_db::MemoryDb;
pub use snapshot::{BlockInfo, SnapshotManager};
pub use statedb::{Account, StateDb};

/// Result alias for state operations.
pub type Result<T> = std::result::Result<T, StateError>;
