//! The block gas pool.

use crate::errors::TxError;
use serde::{Deserialize, Serialize};

/// Gas available to the remainder of a block under assembly.
///
/// Initialized to the header gas limit, decremented as transactions
/// are accepted. The pool can never underflow: a subtraction that
/// would exceed the remainder fails with [`TxError::GasLimitReached`]
/// and leaves the pool unchanged.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPool(u64);

impl GasPool {
    /// A pool holding `gas`.
    pub fn new(gas: u64) -> Self {
        Self(gas)
    }

    /// Remaining gas.
    pub fn gas(&self) -> u64 {
        self.0
    }

    /// Return unused gas to the pool.
    pub fn add_gas(&mut self, amount: u64) {
        self.0 = self.0.saturating_add(amount);
    }

    /// Reserve `amount` gas from the pool.
    pub fn sub_gas(&mut self, amount: u64) -> Result<(), TxError> {
        if self.0 < amount {
            return Err(TxError::GasLimitReached);
        }
        self.0 -= amount;
        Ok(())
    }
}
