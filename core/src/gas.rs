//! Gas metering
//!
//! Only as much of the EVM gas model as the executor needs: a per-frame
//! budget, a flat charge for every external call and the 63/64 forwarding
//! rule. A frame that runs out of gas loses its whole budget.

use crate::error::OutOfGas;

/// Gas limit used by [`crate::Tx`] when none is given
pub const DEFAULT_GAS_LIMIT: u64 = 30_000_000;

/// Flat cost of an external call, charged to the caller before forwarding
pub const CALL_BASE_GAS: u64 = 2_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    /// Charge `amount`; on failure the meter is drained.
    pub fn charge(&mut self, amount: u64) -> Result<(), OutOfGas> {
        let remaining = self.remaining();
        if amount > remaining {
            self.used = self.limit;
            return Err(OutOfGas {
                requested: amount,
                remaining,
            });
        }
        self.used += amount;
        Ok(())
    }

    /// Gas a sub-call may receive: all but one 64th of what is left (EIP-150)
    pub fn forwardable(&self) -> u64 {
        let remaining = self.remaining();
        remaining - remaining / 64
    }

    /// Account for gas spent by a child frame
    pub(crate) fn absorb(&mut self, spent: u64) {
        self.used = (self.used + spent).min(self.limit);
    }
}
