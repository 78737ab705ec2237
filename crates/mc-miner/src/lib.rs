//! # Meridian Chain - Block Producer
//!
//! The slot-driven DPoS block producer: on each block interval it
//! decides whether the locally configured validator owns the slot and,
//! if so, assembles, executes, seals, persists, and announces a new
//! block on top of the current head.
//!
//! ```text
//! new chain head ──► head-event loop ──cancel──┐
//!                                              ▼
//! slot boundary  ──► slot loop ──cancel/join/spawn──► assembly attempt
//!                                              │
//!                    ordering queue ◄──drain───┤
//!                    state fork     ◄─execute──┤
//!                                              ▼
//!                          finalize → seal → write → announce
//! ```
//!
//! Phase failure semantics differ: preconditions and candidacy end the
//! attempt for the slot (`WaitParent` alone is retried within it),
//! per-transaction failures map to ordering-queue actions without
//! aborting the block, and only the persistence path is fatal to an
//! otherwise sealed block.

#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod error;
pub mod metrics;
pub mod miner;
pub mod ports;
mod signer;
pub mod worker;

pub use config::MinerConfig;
pub use error::{MinerError, Result};
pub use metrics::Metrics;
pub use miner::Miner;
pub use ports::{ChainPort, PendingPort};
pub use worker::Worker;
