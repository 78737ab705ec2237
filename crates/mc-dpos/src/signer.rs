//! The sealing capability.

use crate::Result;
use mc_state::StateDb;
use shared_types::Name;

/// A capability that can sign block content on behalf of a coinbase.
///
/// The engine names the coinbase and offers the content; the signer
/// decides which configured key, if any, may sign for that account
/// (typically by consulting the account's registered author keys in
/// `state`). Sealing fails if no key qualifies.
pub trait BlockSigner: Send + Sync {
    /// Produce a signature over `content` for `coinbase`.
    fn sign(&self, coinbase: &Name, content: &[u8], state: &StateDb) -> Result<Vec<u8>>;
}
