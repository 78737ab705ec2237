//! Miner configuration.

use serde::Deserialize;

/// Worker configuration.
///
/// Producer identity (coinbase and keys) is not configuration; it is
/// installed at runtime through `set_coinbase`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MinerConfig {
    /// Extra data stamped into produced headers.
    #[serde(default)]
    pub extra: Vec<u8>,

    /// Artificial delay between persisting a block and announcing it,
    /// in milliseconds. Zero in production; useful for ordering
    /// experiments and tests.
    #[serde(default)]
    pub delay_ms: u64,
}
