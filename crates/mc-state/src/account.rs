//! Account-level checks over a state.

use crate::errors::StateError;
use crate::statedb::StateDb;
use crate::Result;
use primitive_types::U256;
use shared_types::Name;

/// Read-side account queries used by signing and candidacy checks.
///
/// Mutation goes through [`StateDb`] directly; this wrapper only
/// answers questions.
pub struct AccountManager<'s> {
    state: &'s StateDb,
}

impl<'s> AccountManager<'s> {
    /// Wrap a state for account queries.
    pub fn new(state: &'s StateDb) -> Self {
        Self { state }
    }

    /// Whether `author` is a registered author key of `name`.
    ///
    /// This is the check the producer's signer runs before using a
    /// configured private key: only a key whose public half is
    /// registered to the coinbase account may sign its blocks.
    pub fn is_valid_sign(&self, name: &Name, author: &[u8]) -> Result<()> {
        let authors = self.state.authors(name)?;
        if authors.iter().any(|a| a == author) {
            Ok(())
        } else {
            Err(StateError::InvalidSign(name.clone()))
        }
    }

    /// The account's next expected nonce.
    pub fn nonce(&self, name: &Name) -> Result<u64> {
        self.state.nonce(name)
    }

    /// The account's balance.
    pub fn balance(&self, name: &Name) -> Result<U256> {
        self.state.balance(name)
    }
}
