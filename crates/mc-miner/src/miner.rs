//! The public mining facade.

use crate::config::MinerConfig;
use crate::metrics::Metrics;
use crate::ports::{ChainPort, PendingPort};
use crate::worker::Worker;
use k256::ecdsa::SigningKey;
use mc_dpos::Engine;
use shared_bus::InMemoryEventBus;
use shared_types::Name;
use std::sync::Arc;

/// Operator-facing handle around the [`Worker`].
pub struct Miner {
    worker: Arc<Worker>,
}

impl Miner {
    /// Create a miner.
    ///
    /// Must be called from within a tokio runtime; the worker's
    /// head-event loop is spawned immediately.
    pub fn new(
        engine: Arc<dyn Engine>,
        chain: Arc<dyn ChainPort>,
        pool: Arc<dyn PendingPort>,
        bus: Arc<InMemoryEventBus>,
        config: MinerConfig,
    ) -> Self {
        Self {
            worker: Worker::new(engine, chain, pool, bus, config),
        }
    }

    /// Begin producing blocks.
    pub fn start(&self, force: bool) {
        self.worker.start(force);
    }

    /// Stop producing blocks.
    pub fn stop(&self) {
        self.worker.stop();
    }

    /// Whether the miner is active.
    pub fn mining(&self) -> bool {
        self.worker.mining()
    }

    /// Install the producer identity.
    pub fn set_coinbase(&self, name: Name, priv_keys: Vec<SigningKey>) {
        self.worker.set_coinbase(name, priv_keys);
    }

    /// Set the header extra data.
    pub fn set_extra(&self, extra: Vec<u8>) {
        self.worker.set_extra(extra);
    }

    /// Set the artificial post-persist announcement delay.
    pub fn set_delay_duration(&self, delay_ms: u64) {
        self.worker.set_delay_duration(delay_ms);
    }

    /// Production counters.
    pub fn metrics(&self) -> Arc<Metrics> {
        self.worker.metrics()
    }

    /// The underlying worker.
    pub fn worker(&self) -> &Arc<Worker> {
        &self.worker
    }
}
