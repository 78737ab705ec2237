//! Engine configuration.

use serde::Deserialize;
use shared_types::Name;

/// DPoS engine configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct DposConfig {
    /// Block interval in milliseconds.
    pub block_interval_ms: u64,

    /// Genesis candidate schedule, seeded into state at chain creation.
    pub validators: Vec<Name>,

    /// The privileged system account name.
    pub sys_name: Name,

    /// How many blocks past the irreversible mark production tolerates.
    pub reversible_limit: u64,
}

impl DposConfig {
    /// Block interval in nanoseconds.
    pub fn block_interval_ns(&self) -> u64 {
        self.block_interval_ms * 1_000_000
    }
}

impl Default for DposConfig {
    fn default() -> Self {
        Self {
            block_interval_ms: 3_000,
            validators: vec![Name::new("meridian.admin")],
            sys_name: Name::new("meridian.admin"),
            reversible_limit: 12,
        }
    }
}
