//! Chain configuration and genesis allocation.

use primitive_types::U256;
use serde::Deserialize;
use shared_types::Name;

/// One account funded at genesis.
#[derive(Clone, Debug, Deserialize)]
pub struct GenesisAccount {
    /// Account name.
    pub name: Name,

    /// Initial balance.
    pub balance: U256,

    /// SEC1-encoded author public key.
    pub author: Vec<u8>,
}

/// Chain configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ChainConfig {
    /// Human-readable chain name, carried in genesis extra data.
    pub chain_name: String,

    /// The privileged system account. Must match the engine's.
    pub sys_name: Name,

    /// Accounts created at genesis.
    pub accounts: Vec<GenesisAccount>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_name: "meridian".to_string(),
            sys_name: Name::new("meridian.admin"),
            accounts: Vec::new(),
        }
    }
}
