//! The worker's sealing capability.

use k256::ecdsa::signature::Signer;
use k256::ecdsa::{Signature, SigningKey};
use mc_dpos::{BlockSigner, DposError};
use mc_state::{AccountManager, StateDb};
use shared_types::Name;

/// Signs block content with the first configured key whose public half
/// is registered as an author of the coinbase account.
///
/// Built from a snapshot of the producer identity at seal time, so a
/// concurrent `set_coinbase` cannot change the key set mid-seal.
pub(crate) struct CoinbaseSigner {
    priv_keys: Vec<SigningKey>,
    pub_keys: Vec<Vec<u8>>,
}

impl CoinbaseSigner {
    pub(crate) fn new(priv_keys: Vec<SigningKey>, pub_keys: Vec<Vec<u8>>) -> Self {
        Self {
            priv_keys,
            pub_keys,
        }
    }
}

impl BlockSigner for CoinbaseSigner {
    fn sign(
        &self,
        coinbase: &Name,
        content: &[u8],
        state: &StateDb,
    ) -> mc_dpos::Result<Vec<u8>> {
        let accounts = AccountManager::new(state);
        for (priv_key, pub_key) in self.priv_keys.iter().zip(&self.pub_keys) {
            if accounts.is_valid_sign(coinbase, pub_key).is_ok() {
                let signature: Signature = priv_key.sign(content);
                return Ok(signature.to_vec());
            }
        }
        Err(DposError::Sign(format!(
            "not found match private key for sign: {coinbase}"
        )))
    }
}
