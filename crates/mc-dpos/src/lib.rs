//! # Meridian Chain - DPoS Consensus Engine
//!
//! The delegated proof-of-stake engine the block producer drives:
//!
//! - **Slots**: time is divided into fixed windows of
//!   [`Engine::block_interval`] nanoseconds; [`Engine::slot`] floors a
//!   wall-clock instant to its window start. Exactly one candidate is
//!   eligible per slot.
//! - **Candidacy**: [`Engine::is_valid_candidate`] gates production.
//!   Its four misconfiguration sentinels (`SystemTakeOver`,
//!   `TooMuchReversible`, `IllegalCandidateName`,
//!   `IllegalCandidatePubKey`) are the errors a worker surfaces at warn
//!   level; everything else is slot-local noise.
//! - **Sealing**: [`Engine::seal`] obtains a signature over the header
//!   sig-hash from a [`BlockSigner`] capability. The engine never holds
//!   keys; the signer decides which key may speak for the coinbase.
//!
//! The candidate schedule lives in state under the system account, so
//! governance actions can change it without touching configuration.

#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod errors;
pub mod signer;

pub use config::DposConfig;
pub use engine::{Dpos, Engine};
pub use engine::{CANDIDATES_KEY, FORK_ID_KEY, TAKEOVER_KEY};
pub use errors::DposError;
pub use signer::BlockSigner;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, DposError>;
